use crate::{config::ModelConfig, error::ModelError};
use ndarray::{Array, Ix4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

/// Narrow seam over the inference runtime so the pipeline stays
/// runtime-agnostic and testable with a fake.
pub trait ModelService: Send + Sync + 'static {
    /// Runs one inference on a `(1, H, W, 3)` tensor and returns the raw
    /// logits of the single batch entry.
    fn infer(&self, input: &Array<f32, Ix4>) -> Result<Vec<f32>, ModelError>;
}

/// ONNX Runtime backed model handle.
///
/// The runtime requires one in-flight inference per session, so a small
/// pool of mutex-guarded sessions is selected round-robin.
#[derive(Clone)]
pub struct OrtModel {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: Arc<AtomicUsize>,
    output_name: String,
}

impl OrtModel {
    pub fn load(model_path: &Path, model_config: &ModelConfig) -> Result<Self, ort::Error> {
        ort::init().commit()?;

        let num_instances = model_config.num_instances.max(1);
        let sessions = (0..num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_file(model_path)?;
                Ok(Arc::new(Mutex::new(session)))
            })
            .collect::<Result<Vec<_>, ort::Error>>()?;

        let output_name = {
            let session = sessions[0]
                .lock()
                .expect("fresh session mutex cannot be poisoned");

            for input in &session.inputs {
                tracing::info!("Model input {}: {:?}", input.name, input.input_type);
            }
            for output in &session.outputs {
                tracing::info!("Model output {}: {:?}", output.name, output.output_type);
            }

            let expected = [
                1,
                model_config.input_height as i64,
                model_config.input_width as i64,
                3,
            ];
            if let Some(dims) = session.inputs[0].input_type.tensor_shape() {
                // Negative dims are symbolic and allowed to differ.
                let mismatch = dims.len() != expected.len()
                    || dims
                        .iter()
                        .zip(expected.iter())
                        .any(|(&d, &e)| d > 0 && d != e);
                if mismatch {
                    tracing::warn!(
                        "Model input shape {:?} does not match expected {:?}",
                        dims,
                        expected
                    );
                }
            }

            session.outputs[0].name.clone()
        };

        tracing::info!(
            "Loaded model from {:?} with {} sessions",
            model_path,
            num_instances
        );

        Ok(Self {
            sessions: Arc::new(sessions),
            counter: Arc::new(AtomicUsize::new(0)),
            output_name,
        })
    }
}

impl ModelService for OrtModel {
    fn infer(&self, input: &Array<f32, Ix4>) -> Result<Vec<f32>, ModelError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let session_arc = &self.sessions[index];
        let mut session = session_arc
            .lock()
            .map_err(|e| ModelError::Poisoned(e.to_string()))?;

        tracing::debug!("Handling request with session {}", index);
        let owned_buffer;
        let input_view = if input.view().is_standard_layout() {
            input.view()
        } else {
            owned_buffer = input.to_owned();
            owned_buffer.view()
        };

        let tensor_ref = TensorRef::from_array_view(input_view)?;
        let input_tensor = ort::inputs![tensor_ref];

        let outputs = session.run(input_tensor)?;
        let (_shape, data) = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;

        // Batch size is fixed at 1, so the flattened slice is the logit row.
        Ok(data.to_vec())
    }
}
