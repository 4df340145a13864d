//! Local inference backend — runs a GGUF-quantized model on this machine.
//!
//! Uses [Candle](https://github.com/huggingface/candle) (Rust-native ML) to
//! load llama-architecture GGUF weights (TinyLlama, Phi-3, Llama, Mistral,
//! Qwen). The tokenizer is read from `tokenizer.json` next to the model file,
//! falling back to a HuggingFace Hub download.

use async_trait::async_trait;
use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_llama as qlm;
use hf_hub::api::sync::Api;
use localllm_config::ModelConfig;
use localllm_core::error::GenerationError;
use localllm_core::generator::{GenerationRequest, Generator};
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::loader::LoadError;
use crate::stop::{find_stop, truncate_at_stop};

/// Tokenizer used when none ships next to the model file.
const FALLBACK_TOKENIZER_REPO: &str = "TinyLlama/TinyLlama-1.1B-Chat-v1.0";

/// Runtime limits applied to the loaded model.
#[derive(Debug, Clone, Copy)]
pub struct LocalSettings {
    /// Context window in tokens (prompt + completion)
    pub context_size: usize,
    /// CPU threads for the inference pool
    pub threads: usize,
    /// GPU layers requested; any non-zero value selects a CUDA device if one exists
    pub gpu_layers: u32,
}

impl From<&ModelConfig> for LocalSettings {
    fn from(config: &ModelConfig) -> Self {
        Self {
            context_size: config.context_size,
            threads: config.threads,
            gpu_layers: config.gpu_layers,
        }
    }
}

// ── Local Generator ────────────────────────────────────────────────────

/// A generator backed by a GGUF model loaded through Candle.
///
/// The model keeps a KV cache between forward passes, so generations are
/// serialized behind a Mutex.
pub struct LocalGenerator {
    inner: Arc<Mutex<LocalModelState>>,
}

/// The loaded model state (tokenizer + weights + device).
struct LocalModelState {
    model: qlm::ModelWeights,
    tokenizer: Tokenizer,
    device: Device,
    eos_token_id: u32,
    context_size: usize,
}

impl LocalGenerator {
    /// Eagerly load the model at `path` into memory.
    pub fn load(path: &Path, settings: LocalSettings) -> Result<Self, LoadError> {
        init_thread_pool(settings.threads);
        let device = select_device(settings.gpu_layers)?;
        info!(
            path = %path.display(),
            context_size = settings.context_size,
            threads = settings.threads,
            gpu_layers = settings.gpu_layers,
            device = ?device,
            "Loading local GGUF model"
        );
        let state = LocalModelState::load_from_path(path, device, settings.context_size)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(state)),
        })
    }
}

/// Size the global rayon pool Candle's CPU kernels run on.
///
/// Returns `false` if the pool was already built (it can only be sized once
/// per process).
fn init_thread_pool(threads: usize) -> bool {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        Ok(()) => {
            debug!(threads, "Sized inference thread pool");
            true
        }
        Err(e) => {
            warn!(threads, error = %e, "Inference thread pool already initialised, keeping it");
            false
        }
    }
}

fn select_device(gpu_layers: u32) -> Result<Device, LoadError> {
    if gpu_layers == 0 {
        return Ok(Device::Cpu);
    }
    let device = Device::cuda_if_available(0)
        .map_err(|e| LoadError::Backend(format!("Failed to initialise GPU device: {e}")))?;
    if device.is_cpu() {
        warn!(gpu_layers, "GPU layers requested but no CUDA device is available, using CPU");
    }
    Ok(device)
}

impl LocalModelState {
    fn load_from_path(
        path: &Path,
        device: Device,
        context_size: usize,
    ) -> Result<Self, LoadError> {
        let mut file = std::fs::File::open(path)
            .map_err(|e| LoadError::Backend(format!("Failed to open GGUF file: {e}")))?;

        let gguf = gguf_file::Content::read(&mut file)
            .map_err(|e| LoadError::Backend(format!("Failed to parse GGUF file: {e}")))?;

        let model = qlm::ModelWeights::from_gguf(gguf, &mut file, &device)
            .map_err(|e| LoadError::Backend(format!("Failed to load model weights: {e}")))?;

        let tokenizer = load_tokenizer(path)?;

        let eos_token_id = tokenizer
            .token_to_id("</s>")
            .or_else(|| tokenizer.token_to_id("<|endoftext|>"))
            .or_else(|| tokenizer.token_to_id("<|end|>"))
            .or_else(|| tokenizer.token_to_id("<|im_end|>"))
            .or_else(|| tokenizer.token_to_id("<|eot_id|>"))
            .unwrap_or(2); // fallback to common EOS id

        info!(eos_token_id, "Local model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            eos_token_id,
            context_size,
        })
    }

    /// Run inference: tokenize → sample until EOS, a stop sequence, `max_tokens`
    /// or the context window → decode.
    fn generate(&mut self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let encoding = self
            .tokenizer
            .encode(request.prompt.as_str(), true)
            .map_err(|e| GenerationError::Tokenization(e.to_string()))?;

        let prompt_tokens = encoding.get_ids();
        let prompt_len = prompt_tokens.len();
        if prompt_len >= self.context_size {
            return Err(GenerationError::ContextOverflow {
                prompt_tokens: prompt_len,
                context_size: self.context_size,
            });
        }
        let budget = (request.max_tokens as usize).min(self.context_size - prompt_len);

        debug!(
            prompt_tokens = prompt_len,
            budget,
            temperature = request.temperature,
            "Starting local generation"
        );

        let temperature = (request.temperature > 0.0).then_some(request.temperature as f64);
        let mut logits_processor = LogitsProcessor::new(sampling_seed(), temperature, None);

        let mut generated: Vec<u32> = Vec::new();
        let mut input = Tensor::new(prompt_tokens, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(map_candle_err)?;
        let mut index_pos = 0;
        let mut text = String::new();

        while generated.len() < budget {
            let logits = self
                .model
                .forward(&input, index_pos)
                .and_then(|l| l.squeeze(0))
                .map_err(map_candle_err)?;
            index_pos += input.dim(1).map_err(map_candle_err)?;

            let next_token = logits_processor.sample(&logits).map_err(map_candle_err)?;
            if next_token == self.eos_token_id {
                break;
            }
            generated.push(next_token);

            text = self
                .tokenizer
                .decode(&generated, true)
                .map_err(|e| GenerationError::Tokenization(e.to_string()))?;
            if find_stop(&text, &request.stop).is_some() {
                break;
            }

            input = Tensor::new(&[next_token][..], &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(map_candle_err)?;
        }

        debug!(completion_tokens = generated.len(), "Generation complete");

        Ok(truncate_at_stop(&text, &request.stop)
            .trim_end_matches("</s>")
            .trim_end_matches("<|end|>")
            .trim_end_matches("<|im_end|>")
            .trim_end_matches("<|eot_id|>")
            .to_string())
    }
}

fn load_tokenizer(model_path: &Path) -> Result<Tokenizer, LoadError> {
    let local = model_path.with_file_name("tokenizer.json");
    let tokenizer_path = if local.exists() {
        local
    } else {
        warn!(
            repo = FALLBACK_TOKENIZER_REPO,
            "No tokenizer.json found next to GGUF file, downloading fallback tokenizer"
        );
        let api = Api::new()
            .map_err(|e| LoadError::Backend(format!("HuggingFace Hub API error: {e}")))?;
        api.model(FALLBACK_TOKENIZER_REPO.to_string())
            .get("tokenizer.json")
            .map_err(|e| {
                LoadError::Backend(format!("Failed to download fallback tokenizer: {e}"))
            })?
    };
    Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| LoadError::Backend(format!("Failed to load tokenizer: {e}")))
}

fn sampling_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(42)
}

/// Map Candle errors to GenerationError.
fn map_candle_err(e: candle_core::Error) -> GenerationError {
    GenerationError::Inference(format!("Candle inference error: {e}"))
}

// ── Generator trait implementation ─────────────────────────────────────

#[async_trait]
impl Generator for LocalGenerator {
    fn name(&self) -> &str {
        "candle"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<String, GenerationError> {
        // Candle is CPU-bound; keep it off the async workers
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut state = inner.blocking_lock();
            state.generate(&request)
        })
        .await
        .map_err(|e| GenerationError::TaskFailed(format!("Inference task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_model_config() {
        let config = ModelConfig {
            context_size: 4096,
            threads: 2,
            gpu_layers: 0,
            ..ModelConfig::default()
        };
        let settings = LocalSettings::from(&config);
        assert_eq!(settings.context_size, 4096);
        assert_eq!(settings.threads, 2);
    }

    #[test]
    fn thread_pool_is_sized_once() {
        let first = init_thread_pool(3);
        assert!(!init_thread_pool(5));
        if first {
            assert_eq!(rayon::current_num_threads(), 3);
        }
    }

    #[test]
    fn cpu_only_without_gpu_layers() {
        assert!(select_device(0).unwrap().is_cpu());
    }

    #[test]
    fn missing_file_is_a_backend_error() {
        let settings = LocalSettings {
            context_size: 2048,
            threads: 1,
            gpu_layers: 0,
        };
        let result = LocalGenerator::load(Path::new("/nonexistent/model.gguf"), settings);
        assert!(matches!(result, Err(LoadError::Backend(_))));
    }
}
