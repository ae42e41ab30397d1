//! FFI bindings for Glyco Insights
//!
//! This module provides C-compatible functions for calling the engine from
//! mobile and web hosts. All functions use C strings (null-terminated) and
//! return allocated memory that must be freed by the caller using
//! `insights_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::classifier::{classify, MetricReading};
use crate::config::InsightsConfig;
use crate::error::ComputeError;
use crate::pipeline::{insights_from_json, InsightsEngine};
use crate::types::MetricKind;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a result across the boundary: the string on success, NULL plus
/// last-error otherwise
fn finish(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute an insights report from input JSON with default settings.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `insights_free_string`.
/// - Returns NULL on error; call `insights_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn insights_compute(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    finish(insights_from_json(json_str))
}

/// Compute an insights report using a JSON configuration.
///
/// # Safety
/// - `json` and `config_json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `insights_free_string`.
/// - Returns NULL on error; call `insights_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn insights_compute_with_config(
    json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let config_str = match cstr_to_string(config_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid config string pointer");
            return ptr::null_mut();
        }
    };

    finish(
        InsightsConfig::from_json(&config_str)
            .and_then(InsightsEngine::with_config)
            .and_then(|engine| engine.compute_json(&json_str)),
    )
}

/// Classify a single reading and return the classified metric as JSON.
///
/// `kind` is one of `bmi`, `hba1c`, `fasting_glucose`, `blood_pressure`.
/// For blood pressure, `value` is systolic and `secondary` diastolic;
/// `secondary` is ignored otherwise.
///
/// # Safety
/// - `kind` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `insights_free_string`.
/// - Returns NULL on error; call `insights_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn insights_classify(
    kind: *const c_char,
    value: f64,
    secondary: f64,
) -> *mut c_char {
    clear_last_error();

    let kind_str = match cstr_to_string(kind) {
        Some(s) => s,
        None => {
            set_last_error("Invalid kind string pointer");
            return ptr::null_mut();
        }
    };

    finish(
        kind_str
            .parse::<MetricKind>()
            .and_then(|kind| MetricReading::from_parts(kind, value, Some(secondary)))
            .and_then(classify)
            .and_then(|classified| {
                serde_json::to_string(&classified)
                    .map_err(|e| ComputeError::EncodingError(e.to_string()))
            }),
    )
}

// ============================================================================
// Configured Engine API
// ============================================================================

/// Opaque handle to an InsightsEngine
pub struct InsightsEngineHandle {
    engine: InsightsEngine,
}

/// Create an engine. `config_json` may be NULL for default settings.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Must be freed with `insights_engine_free`.
/// - Returns NULL on error; call `insights_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn insights_engine_new(
    config_json: *const c_char,
) -> *mut InsightsEngineHandle {
    clear_last_error();

    let engine = if config_json.is_null() {
        Ok(InsightsEngine::new())
    } else {
        match cstr_to_string(config_json) {
            Some(s) => InsightsConfig::from_json(&s).and_then(InsightsEngine::with_config),
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        }
    };

    match engine {
        Ok(engine) => Box::into_raw(Box::new(InsightsEngineHandle { engine })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `insights_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn insights_engine_free(engine: *mut InsightsEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Compute a report with a configured engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `insights_engine_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `insights_free_string`.
/// - Returns NULL on error; call `insights_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn insights_engine_compute(
    engine: *const InsightsEngineHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let handle = &*engine;
    finish(handle.engine.compute_json(&json_str))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by an `insights_*` function.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an `insights_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn insights_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next `insights_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn insights_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn insights_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
