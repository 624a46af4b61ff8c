use crate::{
    assets::Assets,
    config::ModelConfig,
    error::PredictError,
    model::ModelService,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::imageops::FilterType;
use ndarray::{Array, Ix4};
use serde::Serialize;

/// Classification outcome with the disposal guidance attached.
/// Built fresh per request.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub predicted_label: String,
    pub confidence: f32,
    pub category: String,
    pub instructions: String,
    pub bin_color: String,
}

/// Runs the full pipeline: base64 → RGB image → normalized NHWC tensor →
/// logits → softmax → argmax → label and guidance lookup.
pub fn predict<M: ModelService>(
    model: Option<&M>,
    assets: &Assets,
    model_config: &ModelConfig,
    image_base64: &str,
) -> Result<Prediction, PredictError> {
    let input = image_to_tensor(image_base64, model_config)?;

    let model = model.ok_or(PredictError::ModelUnavailable)?;
    let logits = model.infer(&input)?;

    let probabilities = softmax(&logits);
    let predicted_index = argmax(&probabilities)
        .ok_or_else(|| PredictError::Inference("model produced an empty output".to_string()))?;
    let confidence = probabilities[predicted_index];

    let predicted_label = assets.label_for(predicted_index);
    let guidance = assets.guidance_for(&predicted_label);

    Ok(Prediction {
        predicted_label,
        confidence,
        category: guidance.category,
        instructions: guidance.instructions,
        bin_color: guidance.bin_color,
    })
}

/// Decodes the payload and builds the `(1, H, W, 3)` input tensor with
/// every channel scaled by `1 / pixel_divisor`.
fn image_to_tensor(
    image_base64: &str,
    model_config: &ModelConfig,
) -> Result<Array<f32, Ix4>, PredictError> {
    let image_bytes = BASE64
        .decode(image_base64)
        .map_err(|e| PredictError::Decode(format!("invalid base64 image data: {}", e)))?;

    let image_reader = image::ImageReader::new(std::io::Cursor::new(&image_bytes))
        .with_guessed_format()
        .map_err(|e| PredictError::Decode(format!("error decoding image: {}", e)))?;

    let original_img = image_reader
        .decode()
        .map_err(|e| PredictError::Decode(format!("error decoding image: {}", e)))?;

    let width = model_config.input_width;
    let height = model_config.input_height;
    let img = original_img
        .resize_exact(width, height, FilterType::CatmullRom)
        .to_rgb8();

    let scale = 1.0 / model_config.pixel_divisor;
    let mut input = Array::zeros((1, height as usize, width as usize, 3));
    for (x, y, pixel) in img.enumerate_pixels() {
        let x = x as usize;
        let y = y as usize;
        let [r, g, b] = pixel.0;
        input[[0, y, x, 0]] = (r as f32) * scale;
        input[[0, y, x, 1]] = (g as f32) * scale;
        input[[0, y, x, 2]] = (b as f32) * scale;
    }

    Ok(input)
}

/// Softmax with the max-subtraction stability trick.
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|x| x / sum).collect()
}

/// Index of the largest value; ties resolve to the lowest index.
fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &value) in values.iter().enumerate() {
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}
