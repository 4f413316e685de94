#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Magnitude {
    pub preferred: bool,
    /// The magnitude type code, e.g. "Mw", "ML", "mb"
    pub magnitude_type: String,
    pub value: f64,
    pub author: Option<String>,
}

impl Magnitude {
    pub fn new<S: ToString>(value: f64, magnitude_type: S, preferred: bool) -> Self {
        Self {
            preferred,
            magnitude_type: magnitude_type.to_string(),
            value,
            author: None,
        }
    }

    pub fn with_author<S: ToString>(mut self, author: S) -> Self {
        self.author = Some(author.to_string());
        self
    }
}
