use facefind_core::{FaceFindError, FaceFinder as CoreFinder, FacePhoto, FaceRegion, PixelBuffer};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict};

fn to_py_err(e: FaceFindError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn region_to_dict(py: Python<'_>, region: &FaceRegion) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("x", region.x)?;
    dict.set_item("y", region.y)?;
    dict.set_item("w", region.w)?;
    Ok(dict.into())
}

/// Single-face detector around a loaded cascade model.
///
/// Args:
///     model: Cascade model bytes (JSON or a PHP serialize() dump)
///     resample: Pre-scale inputs toward the reference frame (default: True)
///     reference_frame: (width, height) to pre-scale toward (default: (320, 240))
///     scale_factor: Divisor between scan scales, must exceed 1.0 (default: 1.2)
///     min_step: Minimum position stride in pixels (default: 2)
#[pyclass(name = "FaceFinder", frozen)]
struct PyFaceFinder {
    inner: CoreFinder,
}

#[pymethods]
impl PyFaceFinder {
    #[new]
    #[pyo3(signature = (model, *, resample=None, reference_frame=None, scale_factor=None, min_step=None))]
    fn new(
        model: Vec<u8>,
        resample: Option<bool>,
        reference_frame: Option<(u32, u32)>,
        scale_factor: Option<f64>,
        min_step: Option<u32>,
    ) -> PyResult<Self> {
        let mut finder = CoreFinder::from_model_bytes(&model).map_err(to_py_err)?;
        if let Some(enable) = resample {
            finder = finder.resample(enable);
        }
        if let Some((width, height)) = reference_frame {
            finder = finder.reference_frame(width, height);
        }
        if let Some(factor) = scale_factor {
            finder = finder.scale_factor(factor);
        }
        if let Some(step) = min_step {
            finder = finder.min_step(step);
        }
        Ok(Self { inner: finder })
    }

    /// Number of stages in the loaded cascade.
    #[getter]
    fn stage_count(&self) -> usize {
        self.inner.model().stages().len()
    }

    /// Locate a face in encoded image bytes (JPEG, PNG or WebP).
    ///
    /// Returns:
    ///     dict with keys x, y, w (floats), or None when no face was found
    fn detect(&self, py: Python<'_>, image: Vec<u8>) -> PyResult<Option<Py<PyDict>>> {
        let region = py
            .allow_threads(|| self.inner.detect_image(&image))
            .map_err(to_py_err)?;
        region.map(|r| region_to_dict(py, &r)).transpose()
    }

    /// Locate a face in raw 8-bit grayscale samples, row-major.
    fn detect_gray(
        &self,
        py: Python<'_>,
        data: Vec<u8>,
        width: u32,
        height: u32,
    ) -> PyResult<Option<Py<PyDict>>> {
        let region = py
            .allow_threads(|| {
                let buffer = PixelBuffer::new(&data, width, height)?;
                self.inner.detect(&buffer)
            })
            .map_err(to_py_err)?;
        region.map(|r| region_to_dict(py, &r)).transpose()
    }

    /// Detect and return the face cropped out of the image as JPEG bytes.
    ///
    /// Returns None when no face was found.
    #[pyo3(signature = (image, *, quality=90))]
    fn crop(&self, py: Python<'_>, image: Vec<u8>, quality: u8) -> PyResult<Option<Py<PyBytes>>> {
        let jpeg = py
            .allow_threads(|| -> Result<Option<Vec<u8>>, FaceFindError> {
                let photo = FacePhoto::new(&image)?;
                match photo.find_face(&self.inner)? {
                    Some(region) => Ok(Some(photo.crop_jpeg(&region, quality)?)),
                    None => Ok(None),
                }
            })
            .map_err(to_py_err)?;
        Ok(jpeg.map(|data| PyBytes::new(py, &data).into()))
    }

    /// Detect and return the image with the face outlined in red, as JPEG bytes.
    ///
    /// Returns None when no face was found.
    #[pyo3(signature = (image, *, quality=90))]
    fn overlay(
        &self,
        py: Python<'_>,
        image: Vec<u8>,
        quality: u8,
    ) -> PyResult<Option<Py<PyBytes>>> {
        let jpeg = py
            .allow_threads(|| -> Result<Option<Vec<u8>>, FaceFindError> {
                let photo = FacePhoto::new(&image)?;
                match photo.find_face(&self.inner)? {
                    Some(region) => Ok(Some(photo.overlay_jpeg(&region, quality)?)),
                    None => Ok(None),
                }
            })
            .map_err(to_py_err)?;
        Ok(jpeg.map(|data| PyBytes::new(py, &data).into()))
    }
}

/// Convert a cascade model (JSON or PHP serialize() dump) to JSON text.
#[pyfunction]
fn model_to_json(model: Vec<u8>) -> PyResult<String> {
    facefind_core::CascadeModel::load(&model)
        .and_then(|m| m.to_json())
        .map_err(to_py_err)
}

#[pymodule]
fn facefind(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyFaceFinder>()?;
    m.add_function(wrap_pyfunction!(model_to_json, m)?)?;
    Ok(())
}
