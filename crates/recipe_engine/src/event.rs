use recipe_core::{ExecutionUnit, Parameter};
use serde_json::{Map, Value};

use crate::IngestError;

/// One decoded line of a generation stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Id(String),
    Step(String),
    Files(Vec<String>),
    Execution(ExecutionUnit),
    Parameter(Parameter),
    Unknown(Value),
}

impl StreamEvent {
    /// Decodes one non-blank line. Anything but a JSON object is an error.
    pub fn decode(line: &str) -> Result<Self, IngestError> {
        let value: Value = serde_json::from_str(line).map_err(|source| IngestError::Decode {
            line: line.to_string(),
            source,
        })?;
        match value {
            Value::Object(object) => Ok(Self::classify(object)),
            _ => Err(IngestError::NotAnObject {
                line: line.to_string(),
            }),
        }
    }

    /// Short tag used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Id(_) => "id",
            StreamEvent::Step(_) => "step",
            StreamEvent::Files(_) => "files",
            StreamEvent::Execution(_) => "execution",
            StreamEvent::Parameter(_) => "parameter",
            StreamEvent::Unknown(_) => "unknown",
        }
    }

    fn classify(object: Map<String, Value>) -> Self {
        // Flat form: {"type": "execution", "key": ..} carries its payload inline.
        let tag = object.get("type").and_then(Value::as_str).map(str::to_owned);
        match tag.as_deref() {
            Some("files") => {
                if let Some(files) = object.get("files").and_then(Value::as_array) {
                    return StreamEvent::Files(labels(files));
                }
            }
            Some("execution") => return StreamEvent::Execution(ExecutionUnit::new(Value::Object(object))),
            Some("parameter") => return StreamEvent::Parameter(Parameter::new(Value::Object(object))),
            _ => {}
        }

        if let Some(id) = object.get("id").and_then(scalar_text) {
            return StreamEvent::Id(id);
        }
        if let Some(step) = object.get("step").and_then(Value::as_str) {
            return StreamEvent::Step(step.to_string());
        }
        if let Some(files) = object.get("files").and_then(Value::as_array) {
            return StreamEvent::Files(labels(files));
        }
        if let Some(unit) = object.get("execution").filter(|v| v.is_object()) {
            return StreamEvent::Execution(ExecutionUnit::new(unit.clone()));
        }
        if let Some(param) = object.get("parameter").filter(|v| v.is_object()) {
            return StreamEvent::Parameter(Parameter::new(param.clone()));
        }
        StreamEvent::Unknown(Value::Object(object))
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn labels(files: &[Value]) -> Vec<String> {
    files.iter().filter_map(scalar_text).collect()
}
