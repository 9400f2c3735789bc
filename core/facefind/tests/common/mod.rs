#![allow(dead_code)]

use facefind::FaceRegion;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

/// One stage that accepts every window.
pub const ACCEPT_ALL_JSON: &str = "[[[[[[0.0, 1.0, 1.0, -1, -1], []]]], -1.0]]";

/// Two stages keyed on a dark band above a bright band:
/// the band difference must exceed 0.1·vnorm, then the bright band alone
/// must exceed 0.3·vnorm.
pub const FACE_MODEL_JSON: &str = "[
    [[[[[0.1, -1.0, 1.0, -1, -1], [[2, 4, 16, 5, -1], [2, 10, 16, 5, 1]]]]], 0.0],
    [[[[[0.3, -1.0, 1.0, -1, -1], [[2, 10, 16, 5, 1]]]]], 0.0]
]";

/// The first stage of [`FACE_MODEL_JSON`] as a PHP `serialize()` dump.
pub const FACE_STAGE_PHP: &str = concat!(
    "a:1:{i:0;a:2:{i:0;a:1:{i:0;a:1:{i:0;a:2:{",
    "i:0;a:5:{i:0;d:0.1;i:1;d:-1;i:2;d:1;i:3;i:-1;i:4;i:-1;}",
    "i:1;a:2:{i:0;a:5:{i:0;i:2;i:1;i:4;i:2;i:16;i:3;i:5;i:4;i:-1;}",
    "i:1;a:5:{i:0;i:2;i:1;i:10;i:2;i:16;i:3;i:5;i:4;i:1;}}",
    "}}}i:1;d:0;}}"
);

pub const BACKGROUND: u8 = 128;
pub const SKIN: u8 = 200;
pub const EYES: u8 = 40;

/// Flat background with one square "face": bright, with a dark band across
/// rows `[0.2, 0.45)` of its height.
pub fn face_scene(width: u32, height: u32, face: (u32, u32, u32)) -> Vec<u8> {
    let (fx, fy, side) = face;
    let mut data = vec![BACKGROUND; width as usize * height as usize];
    for y in fy..(fy + side).min(height) {
        let ry = y - fy;
        let value = if ry * 20 >= 4 * side && ry * 20 < 9 * side {
            EYES
        } else {
            SKIN
        };
        for x in fx..(fx + side).min(width) {
            data[(y * width + x) as usize] = value;
        }
    }
    data
}

/// Encode grayscale samples as an RGB PNG with equal channels.
pub fn encode_png(gray: &[u8], width: u32, height: u32) -> Vec<u8> {
    let rgb: Vec<u8> = gray.iter().flat_map(|v| [*v, *v, *v]).collect();
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(&rgb, width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buffer
}

/// True when `region` intersects the square `face`.
pub fn overlaps(region: &FaceRegion, face: (u32, u32, u32)) -> bool {
    let (fx, fy, side) = (f64::from(face.0), f64::from(face.1), f64::from(face.2));
    region.x < fx + side
        && fx < region.x + region.w
        && region.y < fy + side
        && fy < region.y + region.w
}

/// True when `region` covers the whole square `face`.
pub fn contains(region: &FaceRegion, face: (u32, u32, u32)) -> bool {
    let (fx, fy, side) = (f64::from(face.0), f64::from(face.1), f64::from(face.2));
    region.x <= fx
        && region.y <= fy
        && fx + side <= region.x + region.w
        && fy + side <= region.y + region.w
}
