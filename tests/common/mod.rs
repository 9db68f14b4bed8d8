//! Scriptable provider double for orchestration and OCR pipeline tests.
#![allow(dead_code)] // each test binary uses a different subset of the helpers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use atelier_engine::providers::Provider;
use atelier_engine::{EncodedImage, EngineError, GenerationRequest, ProviderReply};

type GenerateFn =
    dyn Fn(usize, &GenerationRequest) -> Result<ProviderReply, EngineError> + Send + Sync;
type CompleteFn = dyn Fn(&str) -> Result<String, EngineError> + Send + Sync;

pub struct FakeProvider {
    name: &'static str,
    pub generate_calls: AtomicUsize,
    pub extract_calls: AtomicUsize,
    pub complete_calls: AtomicUsize,
    pub seen_extract_images: Mutex<Vec<EncodedImage>>,
    generate_fn: Box<GenerateFn>,
    extract_reply: Option<String>,
    complete_fn: Option<Box<CompleteFn>>,
}

impl FakeProvider {
    pub fn new(
        name: &'static str,
        generate_fn: impl Fn(usize, &GenerationRequest) -> Result<ProviderReply, EngineError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name,
            generate_calls: AtomicUsize::new(0),
            extract_calls: AtomicUsize::new(0),
            complete_calls: AtomicUsize::new(0),
            seen_extract_images: Mutex::new(Vec::new()),
            generate_fn: Box::new(generate_fn),
            extract_reply: None,
            complete_fn: None,
        }
    }

    /// Always answers `generate` with plain text and no artifact.
    pub fn text(name: &'static str, reply: &'static str) -> Self {
        Self::new(name, move |_, _| {
            Ok(ProviderReply {
                text: reply.to_string(),
                artifact: None,
            })
        })
    }

    /// Always fails `generate` with the error built by `make_err`.
    pub fn failing(
        name: &'static str,
        make_err: impl Fn() -> EngineError + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, move |_, _| Err(make_err()))
    }

    pub fn with_extract_reply(mut self, reply: &str) -> Self {
        self.extract_reply = Some(reply.to_string());
        self
    }

    pub fn with_complete(
        mut self,
        f: impl Fn(&str) -> Result<String, EngineError> + Send + Sync + 'static,
    ) -> Self {
        self.complete_fn = Some(Box::new(f));
        self
    }

    pub fn generate_call_count(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderReply, EngineError> {
        let n = self.generate_calls.fetch_add(1, Ordering::SeqCst);
        (self.generate_fn)(n, request)
    }

    async fn extract_text(
        &self,
        images: &[EncodedImage],
        _instruction: &str,
    ) -> Result<String, EngineError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_extract_images
            .lock()
            .unwrap()
            .extend_from_slice(images);
        match &self.extract_reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(self.unsupported("extract_text")),
        }
    }

    async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String, EngineError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        match &self.complete_fn {
            Some(f) => f(prompt),
            None => Err(self.unsupported("complete")),
        }
    }
}
