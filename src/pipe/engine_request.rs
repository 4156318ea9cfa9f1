use crate::pipe::{PipeError, PipeResult};
use crate::point_value::{PointValue, State};

/// A transform invocation received over the pipe.
///
/// Carries the transform and point parameters, the input point values, and a
/// mutable result slot seeded from the request header. The driver mutates the
/// result (or clears it, or adds extra results) and hands the request back to
/// [`PipeEndpoint::end_engine_request`](crate::pipe::PipeEndpoint::end_engine_request),
/// which emits the response and consumes the request.
#[derive(Debug)]
pub struct EngineRequest {
    pub(crate) request_id: String,
    pub(crate) version: i32,
    pub(crate) transform_params: Vec<String>,
    pub(crate) point_params: Vec<String>,
    pub(crate) inputs: Vec<PointValue>,
    pub(crate) result: Option<PointValue>,
    pub(crate) extra_results: Vec<PointValue>,
}

impl EngineRequest {
    /// The opaque token echoed in the response.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn transform_params(&self) -> &[String] {
        &self.transform_params
    }

    pub fn point_params(&self) -> &[String] {
        &self.point_params
    }

    pub fn inputs(&self) -> &[PointValue] {
        &self.inputs
    }

    /// The result slot, seeded from the header point value; `None` after
    /// [`clear_results`](Self::clear_results).
    pub fn result(&self) -> Option<&PointValue> {
        self.result.as_ref()
    }

    pub fn extra_results(&self) -> &[PointValue] {
        &self.extra_results
    }

    /// Sets the state of the result.
    ///
    /// Fails when the results have been cleared.
    pub fn set_result_state(&mut self, state: Option<State>) -> PipeResult<()> {
        let result = self.result.as_mut().ok_or(PipeError::ClearedResultState)?;
        result.state = state;
        Ok(())
    }

    /// Sets the value of the result.
    ///
    /// Fails when the results have been cleared.
    pub fn set_result_value(&mut self, value: Option<&str>) -> PipeResult<()> {
        let result = self.result.as_mut().ok_or(PipeError::ClearedResultValue)?;
        result.value = value.map(str::to_string);
        Ok(())
    }

    /// Appends an extra result; emitted before the seed result, in insertion
    /// order. Spaces inside the stamp are normalized to `T`.
    pub fn add_result(
        &mut self,
        point_name: &str,
        stamp: &str,
        state: Option<State>,
        value: Option<&str>,
    ) -> PipeResult<()> {
        if point_name.is_empty() {
            return Err(PipeError::MissingPointName);
        }
        if stamp.is_empty() {
            return Err(PipeError::MissingStamp);
        }

        self.extra_results.push(PointValue {
            point_name: point_name.to_string(),
            stamp: Some(stamp.replace(' ', "T")),
            state,
            value: value.map(str::to_string),
        });
        Ok(())
    }

    /// Drops the result slot and all extra results.
    pub fn clear_results(&mut self) {
        self.result = None;
        self.extra_results.clear();
    }

    // The response summary: with a result slot, 1 + extras when the result
    // carries a value or extras exist, else 0; without one, the extra count,
    // or -1 when there is nothing at all.
    pub(crate) fn summary(&self) -> i32 {
        #[allow(clippy::cast_possible_truncation)]
        #[allow(clippy::cast_possible_wrap)]
        let extras = self.extra_results.len() as i32;
        match &self.result {
            Some(result) => {
                if result.value.is_some() || extras > 0 {
                    1 + extras
                } else {
                    0
                }
            }
            None => {
                if extras > 0 {
                    extras
                } else {
                    -1
                }
            }
        }
    }
}
