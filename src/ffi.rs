// FFI bindings for embedding into a native capture layer (C/C++/mobile)
use std::ffi::CStr;
use std::os::raw::{c_char, c_float, c_int};

use crate::{imread, imwrite, CornerPoints, ScanConfig, Scanner};

/// Opaque handle to a Scanner instance
pub struct PScanHandle {
    inner: Scanner,
}

/// C-compatible detection result. A corner with `has_*` set to 0 was not
/// found; its coordinates are meaningless.
#[repr(C)]
pub struct CDetection {
    pub has_top_left: c_int,
    pub top_left_x: c_float,
    pub top_left_y: c_float,
    pub has_top_right: c_int,
    pub top_right_x: c_float,
    pub top_right_y: c_float,
    pub has_bottom_left: c_int,
    pub bottom_left_x: c_float,
    pub bottom_left_y: c_float,
    pub has_bottom_right: c_int,
    pub bottom_right_x: c_float,
    pub bottom_right_y: c_float,
    pub area: c_float,
    pub better_framing: c_int,
}

/// Create a new scanner
///
/// # Safety
/// The returned handle must be freed with `pscan_free`
#[no_mangle]
pub unsafe extern "C" fn pscan_new(padding: c_float, corner_margin: c_float) -> *mut PScanHandle {
    let scanner = Scanner::with_config(ScanConfig {
        padding,
        corner_margin,
    });
    Box::into_raw(Box::new(PScanHandle { inner: scanner }))
}

/// Run detection on an image file
///
/// Returns 0 on success, -1 on bad arguments, -2 on a non-UTF-8 path,
/// -3 when the image cannot be read, and 1 when no paper was detected
/// (an expected per-frame outcome, `out` is zeroed in that case).
///
/// # Safety
/// - handle must be a valid pointer returned from pscan_new
/// - image_path must be a valid null-terminated UTF-8 string
/// - out must point to writable memory for one CDetection
#[no_mangle]
pub unsafe extern "C" fn pscan_detect_file(
    handle: *mut PScanHandle,
    image_path: *const c_char,
    out: *mut CDetection,
) -> c_int {
    if handle.is_null() || image_path.is_null() || out.is_null() {
        return -1;
    }

    let scanner = &(*handle).inner;

    let path = match CStr::from_ptr(image_path).to_str() {
        Ok(s) => s,
        Err(_) => return -2,
    };

    let img = match imread(path) {
        Ok(i) => i,
        Err(_) => return -3,
    };

    match scanner.detect(&img) {
        Ok(d) => {
            *out = detection_to_c(&d.corners, d.area, d.better_framing);
            0
        }
        Err(_) => {
            *out = detection_to_c(&CornerPoints::default(), 0.0, false);
            1
        }
    }
}

/// Rectify the document in an image file and write the result as PNG
///
/// Corner coordinates come from a prior `pscan_detect_file` (or are
/// caller-chosen); all four must be present in `corners`.
///
/// Returns 0 on success, -1 on bad arguments, -2 on a non-UTF-8 path,
/// -3 when reading/detection fails, -4 when corners are incomplete,
/// -5 when writing the output fails.
///
/// # Safety
/// - handle must be a valid pointer returned from pscan_new
/// - image_path and output_path must be valid null-terminated UTF-8 strings
/// - corners must point to a valid CDetection
#[no_mangle]
pub unsafe extern "C" fn pscan_extract_file(
    handle: *mut PScanHandle,
    image_path: *const c_char,
    output_path: *const c_char,
    corners: *const CDetection,
    width: c_int,
    height: c_int,
) -> c_int {
    if handle.is_null()
        || image_path.is_null()
        || output_path.is_null()
        || corners.is_null()
        || width <= 0
        || height <= 0
    {
        return -1;
    }

    let scanner = &(*handle).inner;

    let path = match CStr::from_ptr(image_path).to_str() {
        Ok(s) => s,
        Err(_) => return -2,
    };
    let out_path = match CStr::from_ptr(output_path).to_str() {
        Ok(s) => s,
        Err(_) => return -2,
    };

    let corner_points = c_to_corners(&*corners);
    if !corner_points.is_complete() {
        return -4;
    }

    let img = match imread(path) {
        Ok(i) => i,
        Err(_) => return -3,
    };

    let paper = match scanner.extract_paper(&img, Some(&corner_points), width as u32, height as u32)
    {
        Ok(p) => p,
        Err(_) => return -3,
    };

    match imwrite(out_path, &paper) {
        Ok(()) => 0,
        Err(_) => -5,
    }
}

/// Free a scanner handle
///
/// # Safety
/// handle must be a valid pointer returned from pscan_new
#[no_mangle]
pub unsafe extern "C" fn pscan_free(handle: *mut PScanHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Get library version
#[no_mangle]
pub extern "C" fn pscan_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}

fn detection_to_c(corners: &CornerPoints, area: f64, better_framing: bool) -> CDetection {
    let unpack = |p: Option<crate::Point2f>| match p {
        Some(p) => (1, p.x, p.y),
        None => (0, 0.0, 0.0),
    };
    let (has_tl, tl_x, tl_y) = unpack(corners.top_left);
    let (has_tr, tr_x, tr_y) = unpack(corners.top_right);
    let (has_bl, bl_x, bl_y) = unpack(corners.bottom_left);
    let (has_br, br_x, br_y) = unpack(corners.bottom_right);

    CDetection {
        has_top_left: has_tl,
        top_left_x: tl_x,
        top_left_y: tl_y,
        has_top_right: has_tr,
        top_right_x: tr_x,
        top_right_y: tr_y,
        has_bottom_left: has_bl,
        bottom_left_x: bl_x,
        bottom_left_y: bl_y,
        has_bottom_right: has_br,
        bottom_right_x: br_x,
        bottom_right_y: br_y,
        area: area as f32,
        better_framing: better_framing as c_int,
    }
}

fn c_to_corners(c: &CDetection) -> CornerPoints {
    let pack = |has: c_int, x: c_float, y: c_float| {
        if has != 0 {
            Some(crate::Point2f::new(x, y))
        } else {
            None
        }
    };
    CornerPoints {
        top_left: pack(c.has_top_left, c.top_left_x, c.top_left_y),
        top_right: pack(c.has_top_right, c.top_right_x, c.top_right_y),
        bottom_left: pack(c.has_bottom_left, c.bottom_left_x, c.bottom_left_y),
        bottom_right: pack(c.has_bottom_right, c.bottom_right_x, c.bottom_right_y),
    }
}
