//! MarianMT encoder-decoder translator (opus-mt checkpoints) running on candle.
//!
//! A model directory holds:
//! - `config.json`: Hugging Face Marian config
//! - `model.safetensors`: weights
//! - `tokenizer-source.json`: tokenizer for the encoder input
//! - `tokenizer-target.json`: tokenizer used to decode generated ids
//!
//! Decoding is greedy. The decoder keeps a KV cache between steps, so a
//! session is used by one translation at a time behind a mutex and each call
//! runs on the blocking pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor, D};
use candle_nn::VarBuilder;
use candle_transformers::models::marian::{Config as MarianConfig, MTModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use super::interface::{TranslationError, Translator};
use crate::config::{DevicePreference, TranslatorConfig};

pub const CONFIG_FILE: &str = "config.json";
pub const WEIGHTS_FILE: &str = "model.safetensors";
pub const SOURCE_TOKENIZER_FILE: &str = "tokenizer-source.json";
pub const TARGET_TOKENIZER_FILE: &str = "tokenizer-target.json";

pub struct MarianTranslator {
    session: Arc<Mutex<MarianSession>>,
    model_path: PathBuf,
    device: Device,
}

struct MarianSession {
    model: MTModel,
    config: MarianConfig,
    source_tokenizer: Tokenizer,
    target_tokenizer: Tokenizer,
    device: Device,
    target_language_token: Option<String>,
    max_output_tokens: usize,
}

impl MarianTranslator {
    /// Load a model directory. Every file is checked before any weights are
    /// mapped so a partial directory fails with the missing file's name.
    pub fn load(settings: &TranslatorConfig) -> Result<Self> {
        let model_path = PathBuf::from(&settings.model_path);
        if !model_path.is_dir() {
            anyhow::bail!("Model directory not found: {}", model_path.display());
        }

        let config_file = required_file(&model_path, CONFIG_FILE)?;
        let weights_file = required_file(&model_path, WEIGHTS_FILE)?;
        let source_tokenizer_file = required_file(&model_path, SOURCE_TOKENIZER_FILE)?;
        let target_tokenizer_file = required_file(&model_path, TARGET_TOKENIZER_FILE)?;

        let config_json = std::fs::read_to_string(&config_file)
            .with_context(|| format!("Failed to read {}", config_file.display()))?;
        let config: MarianConfig = serde_json::from_str(&config_json)
            .with_context(|| format!("Invalid Marian config in {}", config_file.display()))?;
        debug!(
            "Parsed Marian config: vocab_size={}, d_model={}, encoder_layers={}, decoder_layers={}",
            config.vocab_size, config.d_model, config.encoder_layers, config.decoder_layers
        );

        let source_tokenizer = Tokenizer::from_file(&source_tokenizer_file)
            .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", source_tokenizer_file.display(), e))?;
        let target_tokenizer = Tokenizer::from_file(&target_tokenizer_file)
            .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", target_tokenizer_file.display(), e))?;

        let device = select_device(settings.device);
        info!("Loading Marian weights from {} on {:?}", weights_file.display(), device);

        // SAFETY: the weights file is memory-mapped read-only and is not
        // expected to change while the process runs.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[&weights_file], DType::F32, &device)? };
        let model = MTModel::new(&config, vb).context("Failed to build Marian model")?;

        let session = MarianSession::new(
            model,
            config,
            source_tokenizer,
            target_tokenizer,
            device,
            settings,
        );
        Ok(Self::from_session(session, model_path))
    }

    fn from_session(session: MarianSession, model_path: PathBuf) -> Self {
        let device = session.device.clone();
        Self {
            session: Arc::new(Mutex::new(session)),
            model_path,
            device,
        }
    }
}

#[async_trait]
impl Translator for MarianTranslator {
    async fn translate(&self, text: &str) -> Result<String, TranslationError> {
        let session = Arc::clone(&self.session);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let mut guard = session.lock().unwrap_or_else(|poisoned| {
                warn!("Previous translation panicked, resetting model session");
                session.clear_poison();
                let mut guard = poisoned.into_inner();
                guard.model.reset_kv_cache();
                guard
            });
            guard.translate(&text)
        })
        .await
        .map_err(|e| TranslationError::Worker(e.to_string()))?
    }

    fn describe(&self) -> String {
        format!("marian ({}, {:?})", self.model_path.display(), self.device)
    }
}

impl MarianSession {
    fn new(
        model: MTModel,
        config: MarianConfig,
        source_tokenizer: Tokenizer,
        target_tokenizer: Tokenizer,
        device: Device,
        settings: &TranslatorConfig,
    ) -> Self {
        Self {
            model,
            config,
            source_tokenizer,
            target_tokenizer,
            device,
            target_language_token: settings.target_language_token().map(str::to_string),
            max_output_tokens: settings.max_output_tokens,
        }
    }

    fn translate(&mut self, text: &str) -> Result<String, TranslationError> {
        let input_ids = self.encode(text)?;

        // The KV cache must be cleared even when generation fails midway.
        let generated = self.generate(&input_ids);
        self.model.reset_kv_cache();
        let generated = generated?;

        self.target_tokenizer
            .decode(&generated, true)
            .map_err(|e| TranslationError::Tokenizer(e.to_string()))
    }

    /// Source ids for `text` with the language token prefixed and a single
    /// trailing end-of-sequence id.
    fn encode(&self, text: &str) -> Result<Vec<u32>, TranslationError> {
        let input = match &self.target_language_token {
            Some(token) => format!("{} {}", token, text),
            None => text.to_string(),
        };

        let encoding = self
            .source_tokenizer
            .encode(input.as_str(), true)
            .map_err(|e| TranslationError::Tokenizer(e.to_string()))?;
        let mut input_ids = encoding.get_ids().to_vec();
        if input_ids.last() != Some(&self.config.eos_token_id) {
            input_ids.push(self.config.eos_token_id);
        }
        Ok(input_ids)
    }

    /// Greedy decode. Returns the generated ids without the start and
    /// end-of-sequence markers.
    fn generate(&mut self, input_ids: &[u32]) -> Result<Vec<u32>, TranslationError> {
        let input = Tensor::new(input_ids, &self.device)?.unsqueeze(0)?;
        let encoder_xs = self.model.encoder().forward(&input, 0)?;

        let mut token_ids = vec![self.config.decoder_start_token_id];
        for step in 0..self.max_output_tokens {
            let context_size = if step >= 1 { 1 } else { token_ids.len() };
            let start_pos = token_ids.len().saturating_sub(context_size);
            let decoder_input = Tensor::new(&token_ids[start_pos..], &self.device)?.unsqueeze(0)?;

            let logits = self.model.decode(&decoder_input, &encoder_xs, start_pos)?;
            let logits = logits.squeeze(0)?;
            let logits = logits.get(logits.dim(0)? - 1)?;
            let next = logits.argmax(D::Minus1)?.to_scalar::<u32>()?;

            if next == self.config.eos_token_id || next == self.config.forced_eos_token_id {
                return Ok(token_ids.split_off(1));
            }
            token_ids.push(next);
        }

        warn!(
            "Translation hit max_output_tokens={} before end of sequence",
            self.max_output_tokens
        );
        Ok(token_ids.split_off(1))
    }
}

fn required_file(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    if !path.is_file() {
        anyhow::bail!("Missing model file: {}", path.display());
    }
    Ok(path)
}

fn select_device(preference: DevicePreference) -> Device {
    let cuda = || {
        Device::new_cuda(0)
            .map_err(|e| warn!("Failed to initialize CUDA: {}, using CPU", e))
            .ok()
    };
    let metal = || {
        Device::new_metal(0)
            .map_err(|e| warn!("Failed to initialize Metal: {}, using CPU", e))
            .ok()
    };

    let device = match preference {
        DevicePreference::Cpu => None,
        DevicePreference::Cuda => cuda(),
        DevicePreference::Metal => metal(),
        DevicePreference::Auto => {
            if candle_core::utils::cuda_is_available() {
                cuda()
            } else if candle_core::utils::metal_is_available() {
                metal()
            } else {
                None
            }
        }
    };

    device.unwrap_or(Device::Cpu)
}
