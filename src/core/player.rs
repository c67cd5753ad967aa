//! Player identification and per-seat data storage.
//!
//! ## PlayerId
//!
//! Opaque identity of a player (account/wallet id), carried on every action.
//!
//! ## Seat
//!
//! Position at the table: seat 0 moves first, seat 1 second. A match always
//! has exactly two seats; `Seat` makes any other index unrepresentable, also
//! when a snapshot is decoded from the store.
//!
//! ## Seats
//!
//! Per-seat data storage, indexable by `Seat`.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Opaque player identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Create a player id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One of the two seats at the table.
///
/// Serialized as the bare index `0` or `1`.
///
/// ```
/// use ccg_duel::core::Seat;
///
/// assert_eq!(Seat::First.other(), Seat::Second);
/// assert_eq!(Seat::Second.index(), 1);
/// assert!(Seat::try_from(2u8).is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Seat {
    #[default]
    First,
    Second,
}

impl Seat {
    /// Both seats in turn order.
    pub const BOTH: [Seat; 2] = [Seat::First, Seat::Second];

    /// Get the 0-based seat index.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }

    /// The opposing seat.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
}

impl TryFrom<u8> for Seat {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Seat::First),
            1 => Ok(Seat::Second),
            other => Err(format!("seat index must be 0 or 1, got {other}")),
        }
    }
}

impl From<Seat> for u8 {
    fn from(seat: Seat) -> Self {
        seat.index() as u8
    }
}

impl std::fmt::Display for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Seat {}", self.index())
    }
}

/// Per-seat data with O(1) access.
///
/// Serialized as a two-element array.
///
/// ## Example
///
/// ```
/// use ccg_duel::core::{Seat, Seats};
///
/// let mut power = Seats::new(|_| 20);
/// power[Seat::Second] -= 5;
///
/// assert_eq!(power[Seat::First], 20);
/// assert_eq!(power[Seat::Second], 15);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seats<T> {
    data: [T; 2],
}

impl<T> Seats<T> {
    /// Create from a factory called once per seat.
    pub fn new(factory: impl Fn(Seat) -> T) -> Self {
        Self {
            data: [factory(Seat::First), factory(Seat::Second)],
        }
    }

    /// Create from explicit values in seat order.
    pub fn from_array(data: [T; 2]) -> Self {
        Self { data }
    }

    /// Get a reference to a seat's data.
    #[must_use]
    pub fn get(&self, seat: Seat) -> &T {
        &self.data[seat.index()]
    }

    /// Get a mutable reference to a seat's data.
    pub fn get_mut(&mut self, seat: Seat) -> &mut T {
        &mut self.data[seat.index()]
    }

    /// Iterate over (Seat, &T) pairs in seat order.
    pub fn iter(&self) -> impl Iterator<Item = (Seat, &T)> {
        Seat::BOTH.into_iter().zip(self.data.iter())
    }

    /// Iterate over (Seat, &mut T) pairs in seat order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Seat, &mut T)> {
        Seat::BOTH.into_iter().zip(self.data.iter_mut())
    }

    /// Find the seat whose data matches a predicate.
    pub fn position(&self, predicate: impl Fn(&T) -> bool) -> Option<Seat> {
        self.iter().find(|(_, v)| predicate(v)).map(|(seat, _)| seat)
    }
}

impl<T> Index<Seat> for Seats<T> {
    type Output = T;

    fn index(&self, seat: Seat) -> &Self::Output {
        self.get(seat)
    }
}

impl<T> IndexMut<Seat> for Seats<T> {
    fn index_mut(&mut self, seat: Seat) -> &mut Self::Output {
        self.get_mut(seat)
    }
}
