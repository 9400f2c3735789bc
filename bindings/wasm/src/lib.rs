use serde::Deserialize;
use wasm_bindgen::prelude::*;

/// Options for face detection, passed as a JavaScript object.
///
/// All fields are optional; omitted fields keep the reference defaults.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectOptions {
    pub resample: Option<bool>,
    pub reference_width: Option<u32>,
    pub reference_height: Option<u32>,
    /// `{ scaleFactor, minStep }`, each optional.
    pub scan: Option<facefind::ScanOptions>,
}

/// Create a JS `Error` with a `code` property.
fn make_error(code: &str, message: &str) -> JsValue {
    let err = js_sys::Error::new(message);
    let _ = js_sys::Reflect::set(&err, &"code".into(), &JsValue::from_str(code));
    JsValue::from(err)
}

/// Convert a `FaceFindError` into a JS `Error` with a machine-readable `code` property.
fn to_js_error(e: facefind::FaceFindError) -> JsValue {
    use facefind::FaceFindError as E;
    let code = match &e {
        E::ModelParse(_) => "MODEL_PARSE",
        E::EmptyModel
        | E::EmptyTree { .. }
        | E::ChildIndexOutOfBounds { .. }
        | E::BackwardChild { .. }
        | E::RectOutOfWindow { .. } => "INVALID_MODEL",
        E::ZeroDimensions => "ZERO_DIMENSIONS",
        E::BufferSizeMismatch { .. } => "BUFFER_SIZE",
        E::InvalidScaleFactor(_) | E::InvalidReferenceFrame { .. } => "INVALID_OPTIONS",
        E::DecodeError(_) => "DECODE_ERROR",
        E::EncodeError(_) => "ENCODE_ERROR",
    };
    make_error(code, &e.to_string())
}

fn parse_options(options: JsValue) -> Result<DetectOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(DetectOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| make_error("INVALID_OPTIONS", &format!("invalid options: {e}")))
    }
}

/// Apply parsed `DetectOptions` to a `FaceFinder`.
fn apply_options(mut finder: facefind::FaceFinder, opts: &DetectOptions) -> facefind::FaceFinder {
    if let Some(enable) = opts.resample {
        finder = finder.resample(enable);
    }
    if opts.reference_width.is_some() || opts.reference_height.is_some() {
        let (width, height) = facefind::REFERENCE_FRAME;
        finder = finder.reference_frame(
            opts.reference_width.unwrap_or(width),
            opts.reference_height.unwrap_or(height),
        );
    }
    if let Some(scan) = opts.scan {
        finder = finder.scan_options(scan);
    }
    finder
}

/// Build `{ x, y, w }`, or `null` when there is no region.
fn build_region_object(region: Option<facefind::FaceRegion>) -> Result<JsValue, JsValue> {
    let Some(region) = region else {
        return Ok(JsValue::NULL);
    };
    let obj = js_sys::Object::new();
    js_sys::Reflect::set(&obj, &"x".into(), &JsValue::from(region.x))?;
    js_sys::Reflect::set(&obj, &"y".into(), &JsValue::from(region.y))?;
    js_sys::Reflect::set(&obj, &"w".into(), &JsValue::from(region.w))?;
    Ok(JsValue::from(obj))
}

/// A face detector holding a loaded cascade model.
#[wasm_bindgen]
pub struct Detector {
    inner: facefind::FaceFinder,
}

#[wasm_bindgen]
impl Detector {
    /// Load a cascade model (JSON or PHP `serialize()` dump).
    ///
    /// @param model - Model bytes
    /// @param options - Optional object with fields: resample,
    ///   referenceWidth, referenceHeight, scan: { scaleFactor, minStep }
    #[wasm_bindgen(constructor)]
    pub fn new(model: &[u8], options: JsValue) -> Result<Detector, JsValue> {
        let opts = parse_options(options)?;
        let finder = facefind::FaceFinder::from_model_bytes(model).map_err(to_js_error)?;
        Ok(Detector {
            inner: apply_options(finder, &opts),
        })
    }

    /// Number of stages in the loaded cascade.
    #[wasm_bindgen(getter, js_name = "stageCount")]
    pub fn stage_count(&self) -> usize {
        self.inner.model().stages().len()
    }

    /// Locate a face in encoded image bytes (JPEG, PNG, or WebP).
    ///
    /// Returns `{ x, y, w }` or `null`.
    pub fn detect(&self, input: &[u8]) -> Result<JsValue, JsValue> {
        let region = self.inner.detect_image(input).map_err(to_js_error)?;
        build_region_object(region)
    }

    /// Locate a face in raw 8-bit grayscale samples, row-major.
    #[wasm_bindgen(js_name = "detectGray")]
    pub fn detect_gray(&self, data: &[u8], width: u32, height: u32) -> Result<JsValue, JsValue> {
        let buffer = facefind::PixelBuffer::new(data, width, height).map_err(to_js_error)?;
        let region = self.inner.detect(&buffer).map_err(to_js_error)?;
        build_region_object(region)
    }

    /// Detect and return the face cropped out as JPEG bytes, or `undefined`.
    #[wasm_bindgen(js_name = "cropFace")]
    pub fn crop_face(&self, input: &[u8], quality: u8) -> Result<Option<Vec<u8>>, JsValue> {
        let photo = facefind::FacePhoto::new(input).map_err(to_js_error)?;
        match photo.find_face(&self.inner).map_err(to_js_error)? {
            Some(region) => photo.crop_jpeg(&region, quality).map(Some).map_err(to_js_error),
            None => Ok(None),
        }
    }

    /// Detect and return the photo with the face outlined in red as JPEG
    /// bytes, or `undefined`.
    pub fn overlay(&self, input: &[u8], quality: u8) -> Result<Option<Vec<u8>>, JsValue> {
        let photo = facefind::FacePhoto::new(input).map_err(to_js_error)?;
        match photo.find_face(&self.inner).map_err(to_js_error)? {
            Some(region) => photo.overlay_jpeg(&region, quality).map(Some).map_err(to_js_error),
            None => Ok(None),
        }
    }
}

/// Convert a cascade model to its JSON form.
#[wasm_bindgen(js_name = "modelToJson")]
pub fn model_to_json(model: &[u8]) -> Result<String, JsValue> {
    facefind::CascadeModel::load(model)
        .and_then(|m| m.to_json())
        .map_err(to_js_error)
}
