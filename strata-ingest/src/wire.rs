//! The self-describing frame payload: a CBOR-encoded map with at least
//! `name` and `type` keys, decoded into a [`WireMessage`] the server can
//! route, or recognized-but-discarded as an unknown type.

use std::collections::BTreeMap;

use serde_cbor::value::Value as Cbor;
use strata_core::{Observation, Value};

use crate::error::FramingError;

/// A decoded frame payload, one observation or batch of observations bound
/// to a signal name.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    /// `"sample"`: a single scalar at time `t`.
    Sample {
        /// Target signal.
        name: String,
        /// The decoded observation.
        observation: Observation,
    },
    /// `"samples"`: uniformly spaced scalars starting at `t`, step `dt`.
    Samples {
        /// Target signal.
        name: String,
        /// The decoded observations, in time order.
        observations: Vec<Observation>,
    },
    /// `"batch"`: a list of `(t, value)` pairs with heterogeneous timing.
    Batch {
        /// Target signal.
        name: String,
        /// The decoded observations, in the order received.
        observations: Vec<Observation>,
    },
    /// `"event"`: one event with attribute bindings.
    Event {
        /// Target signal.
        name: String,
        /// The decoded observation.
        observation: Observation,
    },
}

impl WireMessage {
    /// The signal name this message targets.
    pub fn name(&self) -> &str {
        match self {
            WireMessage::Sample { name, .. }
            | WireMessage::Samples { name, .. }
            | WireMessage::Batch { name, .. }
            | WireMessage::Event { name, .. } => name,
        }
    }

    /// The observations carried by this message, in order.
    pub fn into_observations(self) -> Vec<Observation> {
        match self {
            WireMessage::Sample { observation, .. } | WireMessage::Event { observation, .. } => {
                vec![observation]
            }
            WireMessage::Samples { observations, .. } | WireMessage::Batch { observations, .. } => {
                observations
            }
        }
    }
}

/// The outcome of decoding one frame's payload: either a message to route,
/// or a recognized-but-unsupported `type` value to log and discard.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedPayload {
    /// A message ready to route into the registry.
    Message(WireMessage),
    /// The payload decoded fine but named a `type` this server does not
    /// understand; the caller logs and moves on to the next frame.
    UnknownType(String),
}

/// Decodes one frame's payload bytes into a [`DecodedPayload`].
pub fn decode_payload(bytes: &[u8]) -> Result<DecodedPayload, FramingError> {
    let value: Cbor = serde_cbor::from_slice(bytes).map_err(FramingError::Cbor)?;
    let map = as_map(&value)?;

    let name = text_field(map, "name")?;
    let typ = text_field(map, "type")?;

    match typ.as_str() {
        "sample" => {
            let t = float_field(map, "t")?;
            let v = float_field(map, "value")?;
            Ok(DecodedPayload::Message(WireMessage::Sample {
                name,
                observation: Observation::new(t, Value::Scalar(v)),
            }))
        }
        "samples" => {
            let t0 = float_field(map, "t")?;
            let dt = float_field(map, "dt")?;
            let values = array_field(map, "values")?;
            let observations = values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let value = as_f64(v)?;
                    Ok(Observation::new(t0 + dt * i as f64, Value::Scalar(value)))
                })
                .collect::<Result<Vec<_>, FramingError>>()?;
            Ok(DecodedPayload::Message(WireMessage::Samples { name, observations }))
        }
        "batch" => {
            let batch = array_field(map, "batch")?;
            let observations = batch
                .iter()
                .map(|pair| {
                    let pair = as_array(pair)?;
                    if pair.len() != 2 {
                        return Err(FramingError::Malformed("batch entry is not a (t, value) pair"));
                    }
                    let t = as_f64(&pair[0])?;
                    let v = as_f64(&pair[1])?;
                    Ok(Observation::new(t, Value::Scalar(v)))
                })
                .collect::<Result<Vec<_>, FramingError>>()?;
            Ok(DecodedPayload::Message(WireMessage::Batch { name, observations }))
        }
        "event" => {
            let t = float_field(map, "t")?;
            let attributes = map_field(map, "attributes")?;
            let mut attrs = BTreeMap::new();
            for (k, v) in attributes {
                let key = as_text(k)?;
                let value = as_text(v)?;
                attrs.insert(key, value);
            }
            Ok(DecodedPayload::Message(WireMessage::Event {
                name,
                observation: Observation::new(t, Value::Event(attrs)),
            }))
        }
        other => Ok(DecodedPayload::UnknownType(other.to_string())),
    }
}

/// Encodes a [`WireMessage`] back into frame payload bytes.
///
/// This is the counterpart a producer uses; the server only ever decodes,
/// but the same module owns both directions so the wire shape is defined
/// exactly once and the round-trip property (encode then decode is a
/// no-op) is testable in-crate.
pub fn encode_message(msg: &WireMessage) -> Vec<u8> {
    let value = match msg {
        WireMessage::Sample { name, observation } => {
            let v = match &observation.value {
                Value::Scalar(v) => *v,
                _ => unreachable!("Sample always carries a scalar"),
            };
            map(vec![
                ("name", Cbor::Text(name.clone())),
                ("type", Cbor::Text("sample".to_string())),
                ("t", Cbor::Float(observation.timestamp)),
                ("value", Cbor::Float(v)),
            ])
        }
        WireMessage::Samples { name, observations } => {
            let t = observations.first().map(|o| o.timestamp).unwrap_or(0.0);
            let dt = if observations.len() > 1 {
                observations[1].timestamp - observations[0].timestamp
            } else {
                0.0
            };
            let values = observations
                .iter()
                .map(|o| match o.value {
                    Value::Scalar(v) => Cbor::Float(v),
                    _ => unreachable!("Samples always carries scalars"),
                })
                .collect();
            map(vec![
                ("name", Cbor::Text(name.clone())),
                ("type", Cbor::Text("samples".to_string())),
                ("t", Cbor::Float(t)),
                ("dt", Cbor::Float(dt)),
                ("values", Cbor::Array(values)),
            ])
        }
        WireMessage::Batch { name, observations } => {
            let batch = observations
                .iter()
                .map(|o| match o.value {
                    Value::Scalar(v) => Cbor::Array(vec![Cbor::Float(o.timestamp), Cbor::Float(v)]),
                    _ => unreachable!("Batch always carries scalars"),
                })
                .collect();
            map(vec![
                ("name", Cbor::Text(name.clone())),
                ("type", Cbor::Text("batch".to_string())),
                ("batch", Cbor::Array(batch)),
            ])
        }
        WireMessage::Event { name, observation } => {
            let attrs = match &observation.value {
                Value::Event(attrs) => attrs,
                _ => unreachable!("Event always carries an attribute map"),
            };
            let attr_map = attrs
                .iter()
                .map(|(k, v)| (Cbor::Text(k.clone()), Cbor::Text(v.clone())))
                .collect();
            map(vec![
                ("name", Cbor::Text(name.clone())),
                ("type", Cbor::Text("event".to_string())),
                ("t", Cbor::Float(observation.timestamp)),
                ("attributes", Cbor::Map(attr_map)),
            ])
        }
    };
    serde_cbor::to_vec(&value).expect("CBOR encoding of a well-formed wire message cannot fail")
}

fn map(fields: Vec<(&str, Cbor)>) -> Cbor {
    Cbor::Map(
        fields
            .into_iter()
            .map(|(k, v)| (Cbor::Text(k.to_string()), v))
            .collect(),
    )
}

fn as_map(value: &Cbor) -> Result<&BTreeMap<Cbor, Cbor>, FramingError> {
    match value {
        Cbor::Map(m) => Ok(m),
        _ => Err(FramingError::Malformed("payload is not a map")),
    }
}

fn as_array(value: &Cbor) -> Result<&Vec<Cbor>, FramingError> {
    match value {
        Cbor::Array(a) => Ok(a),
        _ => Err(FramingError::Malformed("expected an array")),
    }
}

fn as_text(value: &Cbor) -> Result<String, FramingError> {
    match value {
        Cbor::Text(s) => Ok(s.clone()),
        _ => Err(FramingError::Malformed("expected text")),
    }
}

fn as_f64(value: &Cbor) -> Result<f64, FramingError> {
    match value {
        Cbor::Float(f) => Ok(*f),
        Cbor::Integer(i) => Ok(*i as f64),
        _ => Err(FramingError::Malformed("expected a number")),
    }
}

fn text_field(map: &BTreeMap<Cbor, Cbor>, key: &'static str) -> Result<String, FramingError> {
    map.get(&Cbor::Text(key.to_string()))
        .ok_or(FramingError::MissingField(key))
        .and_then(as_text)
}

fn float_field(map: &BTreeMap<Cbor, Cbor>, key: &'static str) -> Result<f64, FramingError> {
    map.get(&Cbor::Text(key.to_string()))
        .ok_or(FramingError::MissingField(key))
        .and_then(as_f64)
}

fn array_field<'a>(
    map: &'a BTreeMap<Cbor, Cbor>,
    key: &'static str,
) -> Result<&'a Vec<Cbor>, FramingError> {
    map.get(&Cbor::Text(key.to_string()))
        .ok_or(FramingError::MissingField(key))
        .and_then(as_array)
}

fn map_field<'a>(
    map: &'a BTreeMap<Cbor, Cbor>,
    key: &'static str,
) -> Result<&'a BTreeMap<Cbor, Cbor>, FramingError> {
    map.get(&Cbor::Text(key.to_string()))
        .ok_or(FramingError::MissingField(key))
        .and_then(as_map)
}
