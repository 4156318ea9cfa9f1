use crate::point_value::PointValue;

/// Kind of a sink request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum SinkRequestType {
    /// Store the point value.
    Update,
    /// Drop the point value named by the deletion marker.
    Delete,
}

impl SinkRequestType {
    /// A human-readable label, for logging.
    pub fn label(self) -> &'static str {
        match self {
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

/// A store-or-delete instruction received over the pipe.
///
/// The response is emitted by
/// [`PipeEndpoint::end_sink_request`](crate::pipe::PipeEndpoint::end_sink_request)
/// with a caller-supplied summary, conventionally the number of rows
/// affected, negative on failure.
#[derive(Debug)]
pub struct SinkRequest {
    pub(crate) request_id: String,
    pub(crate) version: i32,
    pub(crate) request_type: SinkRequestType,
    pub(crate) point_value: PointValue,
}

impl SinkRequest {
    /// The opaque token echoed in the response.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn request_type(&self) -> SinkRequestType {
        self.request_type
    }

    pub fn point_value(&self) -> &PointValue {
        &self.point_value
    }
}
