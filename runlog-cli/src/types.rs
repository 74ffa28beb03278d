//! Common types used across CLI modules

/// How the user names a run on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunRef {
    /// The newest run in the index
    Latest,
    /// A run ID or an unambiguous prefix of one
    Id(String),
}

impl RunRef {
    /// Parse a string into a RunRef; `latest` is reserved
    pub fn parse(input: &str) -> Self {
        if input.eq_ignore_ascii_case("latest") {
            RunRef::Latest
        } else {
            RunRef::Id(input.to_string())
        }
    }
}

impl std::fmt::Display for RunRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunRef::Latest => write!(f, "latest"),
            RunRef::Id(id) => write!(f, "{}", id),
        }
    }
}

impl From<&str> for RunRef {
    fn from(s: &str) -> Self {
        RunRef::parse(s)
    }
}
