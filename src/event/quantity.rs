/**
A physical value that may carry an uncertainty.

QuakeML distinguishes between a bare value, a value with a single symmetric
uncertainty and a value with distinct lower and upper uncertainties. The
uncertainty is always expressed in the same unit as the value (seconds for
timestamps).
*/
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Quantity<T> {
    Value(T),
    Uncertain { value: T, uncertainty: f64 },
    Bounded { value: T, lower: f64, upper: f64 },
}

impl<T> Quantity<T> {
    pub fn uncertain(value: T, uncertainty: f64) -> Self {
        Self::Uncertain { value, uncertainty }
    }

    pub fn bounded(value: T, lower: f64, upper: f64) -> Self {
        Self::Bounded {
            value,
            lower,
            upper,
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Value(value) => value,
            Self::Uncertain { value, .. } => value,
            Self::Bounded { value, .. } => value,
        }
    }

    /// The symmetric uncertainty, if this quantity has one
    pub fn uncertainty(&self) -> Option<f64> {
        match self {
            Self::Uncertain { uncertainty, .. } => Some(*uncertainty),
            _ => None,
        }
    }

    /// The `(lower, upper)` uncertainty pair, if this quantity has one
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match self {
            Self::Bounded { lower, upper, .. } => Some((*lower, *upper)),
            _ => None,
        }
    }

    /// Apply `f` to the value, keeping the uncertainty unchanged
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Quantity<U> {
        match self {
            Self::Value(value) => Quantity::Value(f(value)),
            Self::Uncertain { value, uncertainty } => Quantity::Uncertain {
                value: f(value),
                uncertainty,
            },
            Self::Bounded {
                value,
                lower,
                upper,
            } => Quantity::Bounded {
                value: f(value),
                lower,
                upper,
            },
        }
    }
}

impl<T: Copy> Quantity<T> {
    pub fn get(&self) -> T {
        *self.value()
    }
}

impl Quantity<f64> {
    /// Multiply the value and its uncertainties by `factor`, e.g. to convert units
    pub fn scale(self, factor: f64) -> Self {
        match self {
            Self::Value(value) => Self::Value(value * factor),
            Self::Uncertain { value, uncertainty } => Self::Uncertain {
                value: value * factor,
                uncertainty: uncertainty * factor,
            },
            Self::Bounded {
                value,
                lower,
                upper,
            } => Self::Bounded {
                value: value * factor,
                lower: lower * factor,
                upper: upper * factor,
            },
        }
    }
}

impl<T> From<T> for Quantity<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T: Default> Default for Quantity<T> {
    fn default() -> Self {
        Self::Value(T::default())
    }
}
