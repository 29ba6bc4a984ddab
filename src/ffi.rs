//! FFI (Foreign Function Interface) bindings for the plugin front end.
//!
//! The front end holds one opaque depot handle and calls the three
//! operations through it. Results cross the boundary as JSON strings so the
//! host does not need to mirror Rust struct layouts.
//!
//! # Memory Management
//!
//! - Rust allocates memory and returns pointers to the host
//! - The calling code MUST call the corresponding `_free` functions to prevent leaks
//! - Strings are null-terminated UTF-8
//!
//! # Usage from Python (ctypes)
//!
//! ```python
//! lib = ctypes.CDLL("libprefixdepot_core.so")
//! lib.prefixdepot_get_inventory.restype = ctypes.c_void_p
//! depot = lib.prefixdepot_new()
//! ptr = lib.prefixdepot_get_inventory(depot)
//! rows = json.loads(ctypes.string_at(ptr))
//! lib.prefixdepot_free_string(ptr)
//! ```

use crate::config::DepotConfig;
use crate::engine::PrefixDepot;
use serde::Serialize;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use tracing::error;

// ============================================================================
// C-Compatible Types
// ============================================================================

/// Opaque handle to a depot and its last inventory
#[repr(C)]
pub struct CPrefixDepot {
    depot: PrefixDepot,
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Create a depot using the default locations under `$HOME`.
/// Returns null if `$HOME` is not set.
/// Caller MUST call prefixdepot_free() when done.
#[no_mangle]
pub extern "C" fn prefixdepot_new() -> *mut CPrefixDepot {
    match PrefixDepot::from_env() {
        Ok(depot) => Box::into_raw(Box::new(CPrefixDepot { depot })),
        Err(e) => {
            error!("Error creating depot: {:#}", e);
            ptr::null_mut()
        }
    }
}

/// Create a depot from a JSON-encoded configuration
/// (`{"steamRoot": ..., "mediaRoot": ..., "shortcutsGlob": ..., "backupDir": ..., "errorLog": ...}`).
/// Returns null on invalid input.
/// Caller MUST call prefixdepot_free() when done.
#[no_mangle]
pub extern "C" fn prefixdepot_new_with_config(config_json: *const c_char) -> *mut CPrefixDepot {
    let Some(json) = c_char_to_str(config_json) else {
        return ptr::null_mut();
    };

    match serde_json::from_str::<DepotConfig>(json) {
        Ok(config) => Box::into_raw(Box::new(CPrefixDepot {
            depot: PrefixDepot::new(config),
        })),
        Err(e) => {
            error!("Error parsing depot configuration: {}", e);
            ptr::null_mut()
        }
    }
}

/// Free a depot returned by prefixdepot_new() or prefixdepot_new_with_config().
#[no_mangle]
pub extern "C" fn prefixdepot_free(handle: *mut CPrefixDepot) {
    if !handle.is_null() {
        unsafe {
            let _ = Box::from_raw(handle);
        }
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Rebuild the inventory and return it as a JSON array of records.
/// Caller MUST call prefixdepot_free_string() when done.
#[no_mangle]
pub extern "C" fn prefixdepot_get_inventory(handle: *mut CPrefixDepot) -> *mut c_char {
    if handle.is_null() {
        return ptr::null_mut();
    }

    let records = unsafe { (*handle).depot.get_inventory() };
    to_json_c_char(&records)
}

/// Delete one prefix by app id. If backup is non-zero, archive it first.
/// Returns `{"success": bool, "message": string}` as JSON.
/// Caller MUST call prefixdepot_free_string() when done.
#[no_mangle]
pub extern "C" fn prefixdepot_delete_one(
    handle: *const CPrefixDepot,
    app_id: *const c_char,
    backup: c_int,
) -> *mut c_char {
    if handle.is_null() {
        return ptr::null_mut();
    }
    let Some(app_id) = c_char_to_str(app_id) else {
        return ptr::null_mut();
    };

    let outcome = unsafe { (*handle).depot.delete_one(app_id, backup != 0) };
    to_json_c_char(&outcome)
}

/// Delete every orphaned prefix. If backup is non-zero, archive each first.
/// Returns `{"removed": int, "message": string}` as JSON.
/// Caller MUST call prefixdepot_free_string() when done.
#[no_mangle]
pub extern "C" fn prefixdepot_delete_orphans(
    handle: *const CPrefixDepot,
    backup: c_int,
) -> *mut c_char {
    if handle.is_null() {
        return ptr::null_mut();
    }

    let outcome = unsafe { (*handle).depot.delete_orphans(backup != 0) };
    to_json_c_char(&outcome)
}

// ============================================================================
// String Management
// ============================================================================

/// Free a string returned by FFI functions.
#[no_mangle]
pub extern "C" fn prefixdepot_free_string(s: *mut c_char) {
    free_c_char(s);
}

// ============================================================================
// Helper Functions
// ============================================================================

fn c_char_to_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s).to_str().ok() }
}

fn to_json_c_char<T: Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => string_to_c_char(&json),
        Err(e) => {
            error!("Error serializing result: {}", e);
            ptr::null_mut()
        }
    }
}

fn string_to_c_char(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(c_str) => c_str.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn free_c_char(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            let _ = CString::from_raw(s);
        }
    }
}
