//! Prediction: run a loaded model on one assembled region.

use std::path::Path;

use candle_core::{DType, Device, Module, Tensor};
use ndarray::{ArrayD, IxDyn};
use tracing::{debug, info};

use crate::assemble::{AssembledInput, Assembler};
use crate::error::GenofuseError;
use crate::loader::RegionSlices;
use crate::models::ConvHeadLoader;
use crate::traits::ModelLoader;

/// A model's output for one region: the first (and only) batch element, in host memory.
pub type Prediction = ArrayD<f32>;

/// Loads a model with its [`ModelLoader`] and runs it on assembled regions.
#[derive(Clone, Debug, Default)]
pub struct Predictor<L = ConvHeadLoader> {
    assembler: Assembler,
    loader: L,
}

impl<L: ModelLoader> Predictor<L> {
    pub fn new(assembler: Assembler, loader: L) -> Self {
        Self { assembler, loader }
    }

    pub fn assembler(&self) -> &Assembler {
        &self.assembler
    }

    /// Load the model at `model_path` on the currently selected device.
    ///
    /// The returned [`LoadedPredictor`] can be reused across regions.
    pub fn load(&self, model_path: impl AsRef<Path>) -> Result<LoadedPredictor<L::Model>, GenofuseError> {
        let device = self.assembler.selector().select()?;
        let model = self.loader.load(model_path.as_ref(), &device)?;
        Ok(LoadedPredictor {
            model,
            assembler: self.assembler,
            device,
        })
    }

    /// Load the model at `model_path`, assemble `slices` and run one forward pass.
    pub fn predict(
        &self,
        slices: &RegionSlices,
        model_path: impl AsRef<Path>,
    ) -> Result<Prediction, GenofuseError> {
        self.load(model_path)?.predict(slices)
    }
}

/// A model handle bound to the device it was loaded on.
pub struct LoadedPredictor<M> {
    model: M,
    assembler: Assembler,
    device: Device,
}

impl<M: Module> LoadedPredictor<M> {
    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Assemble `slices` on the model's device and run one forward pass.
    pub fn predict(&self, slices: &RegionSlices) -> Result<Prediction, GenofuseError> {
        let input = self.assembler.assemble_on(slices, &self.device)?;
        self.forward(&input)
    }

    /// Run the model on an assembled input, returning batch element 0 in host memory.
    pub fn forward(&self, input: &AssembledInput) -> Result<Prediction, GenofuseError> {
        let output = self
            .model
            .forward(input.tensor())
            .map_err(|e| GenofuseError::Inference(e.to_string()))?
            .detach();
        debug!("model output {:?}", output.dims());
        let first = output
            .get(0)
            .map_err(|e| GenofuseError::Inference(format!("output has no batch element: {}", e)))?;
        let prediction = to_host_array(&first)?;
        info!("prediction {:?}", prediction.shape());
        Ok(prediction)
    }
}

/// Copy a tensor of any rank into an `f32` host array.
fn to_host_array(tensor: &Tensor) -> Result<ArrayD<f32>, GenofuseError> {
    let inference = |e: candle_core::Error| GenofuseError::Inference(e.to_string());
    let dims = tensor.dims().to_vec();
    let values = tensor
        .to_device(&Device::Cpu)
        .and_then(|t| t.to_dtype(DType::F32))
        .and_then(|t| t.flatten_all())
        .and_then(|t| t.to_vec1::<f32>())
        .map_err(inference)?;
    Ok(ArrayD::from_shape_vec(IxDyn(&dims), values)?)
}

/// Predict one region with the default [`Assembler`] and the [`ConvHeadLoader`].
pub fn prediction(slices: &RegionSlices, model_path: impl AsRef<Path>) -> Result<Prediction, GenofuseError> {
    Predictor::new(Assembler::default(), ConvHeadLoader).predict(slices, model_path)
}
