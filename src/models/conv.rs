//! A per-position convolutional readout over an assembled input.
//!
//! ```text
//! (B, L, C) -> conv1d(C -> hidden, k, same padding) -> relu -> conv1d(hidden -> outputs, 1) -> (B, L, outputs)
//! ```

use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Module, Result as CandleResult, Tensor};
use candle_nn::{conv1d, Conv1d, Conv1dConfig, VarBuilder};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assemble::INPUT_CHANNELS;
use crate::error::GenofuseError;
use crate::traits::ModelLoader;

/// The checkpoint's configuration file name.
pub const CONFIG_FILE: &str = "config.json";

/// The checkpoint's weights file name, used when the checkpoint path is a directory.
pub const WEIGHTS_FILE: &str = "model.safetensors";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvHeadConfig {
    #[serde(default = "default_input_channels")]
    pub input_channels: usize,
    #[serde(default = "default_hidden_channels")]
    pub hidden_channels: usize,
    #[serde(default = "default_kernel_size")]
    pub kernel_size: usize,
    #[serde(default = "default_output_channels")]
    pub output_channels: usize,
}

fn default_input_channels() -> usize {
    INPUT_CHANNELS
}
fn default_hidden_channels() -> usize {
    32
}
fn default_kernel_size() -> usize {
    5
}
fn default_output_channels() -> usize {
    1
}

impl Default for ConvHeadConfig {
    fn default() -> Self {
        Self {
            input_channels: default_input_channels(),
            hidden_channels: default_hidden_channels(),
            kernel_size: default_kernel_size(),
            output_channels: default_output_channels(),
        }
    }
}

impl ConvHeadConfig {
    /// Check the configuration describes a length-preserving network.
    pub fn validate(&self) -> Result<(), GenofuseError> {
        if self.kernel_size % 2 == 0 {
            return Err(GenofuseError::ModelLoad(format!(
                "kernel_size must be odd to preserve the input length, got {}",
                self.kernel_size
            )));
        }
        if self.input_channels == 0 || self.hidden_channels == 0 || self.output_channels == 0 {
            return Err(GenofuseError::ModelLoad(
                "channel counts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct ConvHead {
    conv_in: Conv1d,
    conv_out: Conv1d,
    config: ConvHeadConfig,
}

impl ConvHead {
    /// Build the network from weights under `conv_in.*` and `conv_out.*`.
    pub fn new(config: &ConvHeadConfig, vb: VarBuilder) -> CandleResult<Self> {
        let same = Conv1dConfig {
            padding: config.kernel_size / 2,
            ..Default::default()
        };
        let conv_in = conv1d(
            config.input_channels,
            config.hidden_channels,
            config.kernel_size,
            same,
            vb.pp("conv_in"),
        )?;
        let conv_out = conv1d(
            config.hidden_channels,
            config.output_channels,
            1,
            Conv1dConfig::default(),
            vb.pp("conv_out"),
        )?;
        Ok(Self {
            conv_in,
            conv_out,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &ConvHeadConfig {
        &self.config
    }
}

impl Module for ConvHead {
    fn forward(&self, xs: &Tensor) -> CandleResult<Tensor> {
        let (_, _, channels) = xs.dims3()?;
        if channels != self.config.input_channels {
            return Err(candle_core::Error::Msg(format!(
                "expected {} input channels, got {}",
                self.config.input_channels, channels
            )));
        }
        // channels-first for the convolutions
        let xs = xs.transpose(1, 2)?.contiguous()?;
        let xs = self.conv_in.forward(&xs)?.relu()?;
        let xs = self.conv_out.forward(&xs)?;
        xs.transpose(1, 2)?.contiguous()
    }
}

/// Resolve a checkpoint path into its configuration and weights files.
///
/// A directory holds [`CONFIG_FILE`] and [`WEIGHTS_FILE`]; a `.safetensors` file may
/// have a sibling [`CONFIG_FILE`]. A missing configuration file means default
/// hyperparameters.
fn resolve_checkpoint(path: &Path) -> Result<(PathBuf, PathBuf), GenofuseError> {
    let (config, weights) = if path.is_dir() {
        (path.join(CONFIG_FILE), path.join(WEIGHTS_FILE))
    } else {
        (path.with_file_name(CONFIG_FILE), path.to_path_buf())
    };
    if !weights.is_file() {
        return Err(GenofuseError::MissingFile(weights));
    }
    Ok((config, weights))
}

/// Loads a [`ConvHead`] from a safetensors checkpoint.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConvHeadLoader;

impl ModelLoader for ConvHeadLoader {
    type Model = ConvHead;

    fn load(&self, path: &Path, device: &Device) -> Result<ConvHead, GenofuseError> {
        let (config_path, weights_path) = resolve_checkpoint(path)?;

        let config = if config_path.is_file() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)
                .map_err(|e| GenofuseError::ModelLoad(format!("{}: {}", config_path.display(), e)))?
        } else {
            info!("no {} next to {}, using defaults", CONFIG_FILE, weights_path.display());
            ConvHeadConfig::default()
        };
        config.validate()?;

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[&weights_path], DType::F32, device) }
            .map_err(|e| GenofuseError::ModelLoad(format!("{}: {}", weights_path.display(), e)))?;
        let model = ConvHead::new(&config, vb)
            .map_err(|e| GenofuseError::ModelLoad(format!("{}: {}", weights_path.display(), e)))?;
        info!("loaded model from {} ({:?})", weights_path.display(), config);
        Ok(model)
    }
}
