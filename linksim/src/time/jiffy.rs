use std::{
    fmt::{Debug, Display},
    ops::{Add, AddAssign, Sub},
};

/// One unit of simulated time.
#[derive(PartialEq, PartialOrd, Ord, Eq, Hash, Copy, Clone, Default)]
pub struct Jiffies(pub u64);

impl Jiffies {
    pub const ZERO: Jiffies = Jiffies(0);
    pub const MAX: Jiffies = Jiffies(u64::MAX);

    pub fn saturating_add(self, rhs: Jiffies) -> Jiffies {
        Jiffies(self.0.saturating_add(rhs.0))
    }
}

impl Add for Jiffies {
    type Output = Jiffies;

    fn add(self, rhs: Self) -> Self::Output {
        Jiffies(self.0 + rhs.0)
    }
}

impl Sub for Jiffies {
    type Output = Jiffies;

    fn sub(self, rhs: Self) -> Self::Output {
        Jiffies(self.0 - rhs.0)
    }
}

impl AddAssign<Jiffies> for Jiffies {
    fn add_assign(&mut self, rhs: Jiffies) {
        self.0 += rhs.0
    }
}

impl AddAssign<u64> for Jiffies {
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs
    }
}

impl From<u64> for Jiffies {
    fn from(value: u64) -> Self {
        Jiffies(value)
    }
}

impl Display for Jiffies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Jiffies({})", self.0)
    }
}

impl Debug for Jiffies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
