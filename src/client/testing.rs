// Scripted transport used by unit tests across the crate

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

use super::transport::{Transport, WireResponse};
use crate::error::{ClientError, Result};
use crate::query::QueryPairs;

#[derive(Clone)]
enum Script {
    Body { status: u16, body: String },
    Chunks {
        status: u16,
        content_length: Option<u64>,
        chunks: Vec<std::result::Result<Vec<u8>, String>>,
    },
}

/// Answers by path; unknown paths behave like a refused connection.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, Script>>,
    requests: Mutex<Vec<(String, QueryPairs)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, status: u16, body: impl Into<String>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(path.to_string(), Script::Body { status, body: body.into() });
    }

    /// Serve `chunks` in order; an `Err` chunk drops the connection mid-body.
    pub fn respond_chunks(
        &self,
        path: &str,
        status: u16,
        content_length: Option<u64>,
        chunks: Vec<std::result::Result<Vec<u8>, String>>,
    ) {
        self.scripts.lock().unwrap().insert(
            path.to_string(),
            Script::Chunks {
                status,
                content_length,
                chunks,
            },
        );
    }

    pub fn forget(&self, path: &str) {
        self.scripts.lock().unwrap().remove(path);
    }

    pub fn requests(&self) -> Vec<(String, QueryPairs)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, path: &str, query: &[(&'static str, String)]) -> Result<WireResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((path.to_string(), query.to_vec()));

        let script = self.scripts.lock().unwrap().get(path).cloned();
        match script {
            None => Err(ClientError::Unreachable(format!("connection refused: {}", path))),
            Some(Script::Body { status, body }) => Ok(WireResponse::from_bytes(status, body)),
            Some(Script::Chunks {
                status,
                content_length,
                chunks,
            }) => Ok(WireResponse::from_chunks(
                status,
                content_length,
                chunks
                    .into_iter()
                    .map(|chunk| {
                        chunk
                            .map(Bytes::from)
                            .map_err(|e| io::Error::new(io::ErrorKind::ConnectionReset, e))
                    })
                    .collect(),
            )),
        }
    }
}
