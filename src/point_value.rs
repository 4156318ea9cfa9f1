//! The point value record exchanged on all of the historian's channels.

/// The wire spelling of the deletion marker.
pub const DELETED_STATE: &str = "DELETED";

/// State tag of a point value.
///
/// The deletion marker is an explicit variant rather than a distinguished
/// string, so that a state whose *text* happens to be `DELETED` can never be
/// confused with an actual deletion.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum State {
    /// The point value is a deletion marker.
    Deleted,
    /// An ordinary state tag.
    Text(String),
}

impl State {
    /// The textual rendition; deletion renders as [`DELETED_STATE`].
    pub fn as_text(&self) -> &str {
        match self {
            Self::Deleted => DELETED_STATE,
            Self::Text(text) => text,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl From<&str> for State {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for State {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// A named, time-stamped value.
///
/// `stamp` is textual; the stamps of engine inputs may be absent. When
/// `state` is [`State::Deleted`], `value` carries no meaning.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PointValue {
    /// Name of the point (non-empty).
    pub point_name: String,
    /// Textual time stamp.
    pub stamp: Option<String>,
    /// Optional state tag.
    pub state: Option<State>,
    /// Optional textual value.
    pub value: Option<String>,
}

impl PointValue {
    pub fn new<N: Into<String>>(point_name: N) -> Self {
        Self {
            point_name: point_name.into(),
            ..Self::default()
        }
    }

    /// Whether this point value encodes a deletion.
    pub fn is_deleted(&self) -> bool {
        matches!(self.state, Some(State::Deleted))
    }
}
