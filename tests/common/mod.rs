#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use base64::{prelude::BASE64_STANDARD, Engine};
use itertools::Itertools;
use restvol::client::RemoteArray;
use restvol::data_type::reverse_endianness;
use restvol::transport::{
    Completion, ConnectionContext, HttpMethod, HttpRequest, HttpResponse, Multiplexer,
    TransferHandle, TransportError,
};
use restvol::wire::{decode_json_values, encode_json_values};
use serde_json::{json, Value};

pub const BASE_URL: &str = "http://localhost:5101";

pub fn connection() -> ConnectionContext {
    ConnectionContext::new(BASE_URL)
        .unwrap()
        .with_domain("/home/test/file.h5")
}

/// An in-memory array store answering value requests synchronously.
///
/// Completions are reported in reverse order of submission.
#[derive(Default)]
pub struct MockArrayStore {
    arrays: HashMap<String, (RemoteArray, Vec<u8>)>,
    failures: HashMap<String, VecDeque<u16>>,
    requests: Vec<HttpRequest>,
    completed: Vec<Completion>,
    next_handle: u64,
}

impl MockArrayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `array` holding packed native `elements`.
    pub fn insert(&mut self, array: &RemoteArray, elements: Vec<u8>) {
        let size = array.data_type().fixed_size().unwrap();
        assert_eq!(elements.len() as u64, array.num_elements() * size as u64);
        self.arrays
            .insert(array.id().to_string(), (array.clone(), elements));
    }

    /// Return the packed native elements of array `id`.
    pub fn elements(&self, id: &str) -> &[u8] {
        &self.arrays[id].1
    }

    /// Answer the next requests to array `id` with `statuses` (0 is a connection error).
    pub fn inject_failures(&mut self, id: &str, statuses: &[u16]) {
        self.failures
            .entry(id.to_string())
            .or_default()
            .extend(statuses);
    }

    pub fn requests(&self) -> &[HttpRequest] {
        &self.requests
    }

    pub fn requests_to(&self, id: &str) -> usize {
        let path = format!("/datasets/{id}/value");
        self.requests
            .iter()
            .filter(|request| request.url().contains(&path))
            .count()
    }

    fn handle(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let (path, select) = match request.url().split_once("?select=") {
            Some((path, select)) => (path, Some(select)),
            None => (request.url(), None),
        };
        let id = path
            .strip_prefix(&format!("{BASE_URL}/datasets/"))
            .and_then(|path| path.strip_suffix("/value"))
            .ok_or_else(|| TransportError::InvalidUrl(request.url().to_string()))?
            .to_string();
        if let Some(status) = self.failures.get_mut(&id).and_then(VecDeque::pop_front) {
            return if status == 0 {
                Err(TransportError::Connection("connection reset by peer".to_string()))
            } else {
                Ok(HttpResponse::new(status, br#"{"message": "injected"}"#.to_vec()))
            };
        }
        let Some((array, elements)) = self.arrays.get_mut(&id) else {
            return Ok(HttpResponse::new(404, Vec::new()));
        };
        let data_type = array.data_type().clone();
        let size = data_type.fixed_size().unwrap();
        let shape = array.shape().to_vec();

        let body: Value = if request.header("Content-Type") == Some("application/json") {
            serde_json::from_slice(request.body()).unwrap()
        } else {
            Value::Null
        };
        let (indices, counts) = if let Some(select) = select {
            hyperslab_indices(&shape, &parse_select(select))
        } else if let Some(points) = body.get("points") {
            point_indices(&shape, points)
        } else if let Some(start) = body.get("start") {
            let triples = (0..shape.len())
                .map(|dim| {
                    (
                        start[dim].as_u64().unwrap(),
                        body["stop"][dim].as_u64().unwrap(),
                        body["step"][dim].as_u64().unwrap(),
                    )
                })
                .collect_vec();
            hyperslab_indices(&shape, &triples)
        } else {
            let all = shape.iter().map(|&extent| (0, extent, 1)).collect_vec();
            hyperslab_indices(&shape, &all)
        };

        let is_write = request.method() == HttpMethod::Put
            || body.get("value").is_some()
            || body.get("value_base64").is_some();
        if is_write {
            let mut packed = if let Some(value) = body.get("value") {
                decode_json_values(value, &data_type, indices.len() as u64)
                    .map_err(|err| TransportError::InvalidRequest(err.to_string()))?
            } else {
                let mut packed = match body.get("value_base64") {
                    Some(encoded) => BASE64_STANDARD.decode(encoded.as_str().unwrap()).unwrap(),
                    None => request.body().to_vec(),
                };
                if !array.endianness().is_native() {
                    reverse_endianness(&mut packed, &data_type);
                }
                packed
            };
            if packed.len() != indices.len() * size {
                return Ok(HttpResponse::new(400, Vec::new()));
            }
            for (index, element) in indices.iter().zip(packed.chunks_exact_mut(size)) {
                let index = *index as usize;
                elements[index * size..(index + 1) * size].copy_from_slice(element);
            }
            Ok(HttpResponse::new(200, Vec::new()))
        } else {
            let mut packed = indices
                .iter()
                .flat_map(|&index| {
                    let index = index as usize;
                    elements[index * size..(index + 1) * size].iter().copied()
                })
                .collect_vec();
            if request.header("Accept") == Some("application/octet-stream") {
                if !array.endianness().is_native() {
                    reverse_endianness(&mut packed, &data_type);
                }
                Ok(HttpResponse::new(200, packed))
            } else {
                let Value::Array(values) =
                    encode_json_values(&packed, &data_type, indices.len()).unwrap()
                else {
                    unreachable!()
                };
                let value = nest(values, &counts);
                Ok(HttpResponse::new(
                    200,
                    json!({"hrefs": [], "value": value}).to_string().into_bytes(),
                ))
            }
        }
    }
}

impl Multiplexer for MockArrayStore {
    fn add(&mut self, request: HttpRequest) -> Result<TransferHandle, TransportError> {
        let handle = TransferHandle::new(self.next_handle);
        self.next_handle += 1;
        let result = self.handle(&request);
        self.requests.push(request);
        self.completed.push((handle, result));
        Ok(handle)
    }

    fn poll(&mut self, _timeout: Duration) -> Vec<Completion> {
        let mut completed = std::mem::take(&mut self.completed);
        completed.reverse();
        completed
    }

    fn pending(&self) -> usize {
        self.completed.len()
    }
}

/// Parse `[start:stop:step,...]`.
fn parse_select(select: &str) -> Vec<(u64, u64, u64)> {
    select
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|triple| {
            let (start, stop, step) = triple
                .split(':')
                .map(|value| value.parse::<u64>().unwrap())
                .collect_tuple()
                .unwrap();
            (start, stop, step)
        })
        .collect()
}

fn strides(shape: &[u64]) -> Vec<u64> {
    let mut strides = vec![1; shape.len()];
    for dim in (0..shape.len().saturating_sub(1)).rev() {
        strides[dim] = strides[dim + 1] * shape[dim + 1];
    }
    strides
}

fn hyperslab_indices(shape: &[u64], triples: &[(u64, u64, u64)]) -> (Vec<u64>, Vec<usize>) {
    let strides = strides(shape);
    let per_dim = triples
        .iter()
        .map(|&(start, stop, step)| (start..stop).step_by(step as usize).collect_vec())
        .collect_vec();
    let counts = per_dim.iter().map(Vec::len).collect_vec();
    let indices = per_dim
        .into_iter()
        .multi_cartesian_product()
        .map(|index| index.iter().zip(&strides).map(|(i, s)| i * s).sum())
        .collect();
    (indices, counts)
}

fn point_indices(shape: &[u64], points: &Value) -> (Vec<u64>, Vec<usize>) {
    let strides = strides(shape);
    let indices = points
        .as_array()
        .unwrap()
        .iter()
        .map(|point| match point {
            Value::Array(coordinates) => coordinates
                .iter()
                .zip(&strides)
                .map(|(coordinate, stride)| coordinate.as_u64().unwrap() * stride)
                .sum(),
            coordinate => coordinate.as_u64().unwrap(),
        })
        .collect_vec();
    let count = indices.len();
    (indices, vec![count])
}

/// Nest a flat array of values by `counts`, one level per dimension.
fn nest(values: Vec<Value>, counts: &[usize]) -> Value {
    if counts.len() <= 1 {
        return Value::Array(values);
    }
    let inner: usize = counts[1..].iter().product();
    if inner == 0 {
        return Value::Array(vec![]);
    }
    Value::Array(
        values
            .into_iter()
            .chunks(inner)
            .into_iter()
            .map(|chunk| nest(chunk.collect(), &counts[1..]))
            .collect(),
    )
}
