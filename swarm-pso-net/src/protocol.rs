//! Message schema for the coordinator protocol
//!
//! Every message is one JSON value per line. Work assignments are flattened:
//! the envelope fields (`particle_id`, `generation`, `run_id`) and the
//! position dimensions share the top level of the object, which is what the
//! existing worker fleet parses. Dimension values honor their domain
//! encoding: integers truncate, booleans map zero/non-zero.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use swarm_pso_core::domain::ValueEncoding;
use swarm_pso_core::particle::WorkItem;

/// Terminal reply once `generation >= max_generations`
pub const COMPLETED_MESSAGE: &str = "PSO completed! Please, don't request anymore";

/// Acknowledgment for an accepted submission
pub const ACK_MESSAGE: &str = "Thank you :)";

/// Prefix of every error reply
pub const ERROR_PREFIX: &str = "there is an error: ";

/// A worker's request, one JSON object per line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Ask for the next evaluation assignment
    RequestWork,
    /// Hand back a fitness value
    SubmitResult(ResultSubmission),
}

/// One evaluated fitness value on its way back to the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultSubmission {
    pub particle_id: usize,
    pub generation: u32,
    pub run_id: u32,
    pub answer: f64,
}

/// Flattened work assignment as it crosses the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPayload {
    pub particle_id: usize,
    pub generation: u32,
    pub run_id: u32,
    /// Dimension values merged into the top level of the JSON object
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

impl From<&WorkItem> for WorkPayload {
    fn from(item: &WorkItem) -> Self {
        let mut parameters = Map::new();
        for p in &item.parameters {
            let value = match p.encoding {
                ValueEncoding::Float => Value::from(p.value),
                ValueEncoding::Integer => Value::from(p.value as i64),
                ValueEncoding::Boolean => Value::from(p.value != 0.0),
            };
            parameters.insert(p.name.clone(), value);
        }
        Self {
            particle_id: item.particle_id,
            generation: item.generation,
            run_id: item.run_id,
            parameters,
        }
    }
}

/// Coordinator's reply to one request line
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorReply {
    /// Evaluate this assignment
    Work(WorkPayload),
    /// Session is over; the worker should stop polling
    Completed,
    /// Submission accepted (or harmlessly discarded)
    Ack,
    /// The request could not be served
    Error(String),
}

impl CoordinatorReply {
    /// Render the reply as its wire JSON value. Work is a flattened
    /// object; everything else is a plain string, matching what legacy
    /// workers expect.
    pub fn to_json(&self) -> crate::Result<Value> {
        Ok(match self {
            CoordinatorReply::Work(payload) => serde_json::to_value(payload)?,
            CoordinatorReply::Completed => Value::String(COMPLETED_MESSAGE.to_owned()),
            CoordinatorReply::Ack => Value::String(ACK_MESSAGE.to_owned()),
            CoordinatorReply::Error(message) => {
                Value::String(format!("{ERROR_PREFIX}{message}"))
            }
        })
    }

    /// Parse a reply from its wire JSON value (worker side).
    pub fn from_json(value: Value) -> crate::Result<Self> {
        match value {
            Value::String(s) if s == COMPLETED_MESSAGE => Ok(CoordinatorReply::Completed),
            Value::String(s) if s == ACK_MESSAGE => Ok(CoordinatorReply::Ack),
            Value::String(s) => match s.strip_prefix(ERROR_PREFIX) {
                Some(message) => Ok(CoordinatorReply::Error(message.to_owned())),
                None => Ok(CoordinatorReply::Error(s)),
            },
            other => Ok(CoordinatorReply::Work(serde_json::from_value(other)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_pso_core::particle::Parameter;

    fn calibration_item() -> WorkItem {
        WorkItem {
            particle_id: 2,
            generation: 7,
            run_id: 3,
            parameters: vec![
                Parameter {
                    name: "rw_mean".to_owned(),
                    value: 5123.5,
                    encoding: ValueEncoding::Float,
                },
                Parameter {
                    name: "nr_robots".to_owned(),
                    value: 4.9,
                    encoding: ValueEncoding::Integer,
                },
                Parameter {
                    name: "u_plus".to_owned(),
                    value: 0.0,
                    encoding: ValueEncoding::Boolean,
                },
            ],
        }
    }

    #[test]
    fn work_payload_flattens_dimensions_into_envelope() {
        let payload = WorkPayload::from(&calibration_item());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "particle_id": 2,
                "generation": 7,
                "run_id": 3,
                "rw_mean": 5123.5,
                "nr_robots": 4,
                "u_plus": false
            })
        );
    }

    #[test]
    fn integer_encoding_truncates_not_rounds() {
        let payload = WorkPayload::from(&calibration_item());
        // 4.9 robots truncates down; you cannot field a fraction of one.
        assert_eq!(payload.parameters["nr_robots"], Value::from(4));
    }

    #[test]
    fn client_request_wire_shapes() {
        let request: ClientRequest =
            serde_json::from_str(r#"{"op": "request_work"}"#).unwrap();
        assert_eq!(request, ClientRequest::RequestWork);

        let submit: ClientRequest = serde_json::from_str(
            r#"{"op": "submit_result", "particle_id": 1, "generation": 0, "run_id": 2, "answer": 0.25}"#,
        )
        .unwrap();
        assert_eq!(
            submit,
            ClientRequest::SubmitResult(ResultSubmission {
                particle_id: 1,
                generation: 0,
                run_id: 2,
                answer: 0.25,
            })
        );
    }

    #[test]
    fn replies_round_trip() {
        let replies = [
            CoordinatorReply::Work(WorkPayload::from(&calibration_item())),
            CoordinatorReply::Completed,
            CoordinatorReply::Ack,
            CoordinatorReply::Error("the generations did not match".to_owned()),
        ];
        for reply in replies {
            let json = reply.to_json().unwrap();
            assert_eq!(CoordinatorReply::from_json(json).unwrap(), reply);
        }
    }

    #[test]
    fn completion_reply_is_the_legacy_string() {
        let json = CoordinatorReply::Completed.to_json().unwrap();
        assert_eq!(
            json,
            Value::String("PSO completed! Please, don't request anymore".to_owned())
        );
    }
}
