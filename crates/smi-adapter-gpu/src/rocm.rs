//! ROCm SMI (AMD GPU) backend
//!
//! Loads `librocm_smi64.so` at runtime and forwards every [`SmiLibrary`] call
//! to the matching `rsmi_*` entry point.

use crate::library::SmiLibrary;
use crate::{GpuError, Result};
use smi_core::Status;

use libloading::Library;
use std::ffi::{c_char, CStr};
use std::path::Path;
use std::ptr;
use tracing::{debug, info, warn};

/// Library names tried when no explicit path is configured
const DEFAULT_LIBRARY_PATHS: &[&str] = &["librocm_smi64.so", "/opt/rocm/lib/librocm_smi64.so"];

const NAME_BUFFER_LEN: usize = 256;

type InitFn = unsafe extern "C" fn(init_flags: u64) -> u32;
type ShutDownFn = unsafe extern "C" fn() -> u32;
type NumMonitorDevicesFn = unsafe extern "C" fn(num_devices: *mut u32) -> u32;
type DevIdFn = unsafe extern "C" fn(dv_ind: u32, id: *mut u16) -> u32;
type DevNameFn = unsafe extern "C" fn(dv_ind: u32, name: *mut c_char, len: usize) -> u32;
type PowerCapFn = unsafe extern "C" fn(dv_ind: u32, sensor_ind: u32, cap: *mut u64) -> u32;
type PowerCapDefaultFn = unsafe extern "C" fn(dv_ind: u32, default_cap: *mut u64) -> u32;
type PowerCapRangeFn =
    unsafe extern "C" fn(dv_ind: u32, sensor_ind: u32, max: *mut u64, min: *mut u64) -> u32;
type PowerAveFn = unsafe extern "C" fn(dv_ind: u32, sensor_ind: u32, power: *mut u64) -> u32;
type StatusStringFn = unsafe extern "C" fn(status: u32, status_string: *mut *const c_char) -> u32;

/// Entry points resolved from the shared library
struct RsmiApi {
    init: InitFn,
    shut_down: ShutDownFn,
    num_monitor_devices: NumMonitorDevicesFn,
    dev_id_get: DevIdFn,
    dev_name_get: DevNameFn,
    dev_power_cap_get: PowerCapFn,
    dev_power_cap_default_get: PowerCapDefaultFn,
    dev_power_cap_range_get: PowerCapRangeFn,
    dev_power_ave_get: PowerAveFn,
    status_string: StatusStringFn,
}

impl RsmiApi {
    fn resolve(library: &Library) -> Result<Self> {
        Ok(Self {
            init: symbol(library, "rsmi_init")?,
            shut_down: symbol(library, "rsmi_shut_down")?,
            num_monitor_devices: symbol(library, "rsmi_num_monitor_devices")?,
            dev_id_get: symbol(library, "rsmi_dev_id_get")?,
            dev_name_get: symbol(library, "rsmi_dev_name_get")?,
            dev_power_cap_get: symbol(library, "rsmi_dev_power_cap_get")?,
            dev_power_cap_default_get: symbol(library, "rsmi_dev_power_cap_default_get")?,
            dev_power_cap_range_get: symbol(library, "rsmi_dev_power_cap_range_get")?,
            dev_power_ave_get: symbol(library, "rsmi_dev_power_ave_get")?,
            status_string: symbol(library, "rsmi_status_string")?,
        })
    }
}

fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T> {
    let mut symbol_name = Vec::with_capacity(name.len() + 1);
    symbol_name.extend_from_slice(name.as_bytes());
    symbol_name.push(0);

    // SAFETY: every `T` used with this helper is the C signature of `name`
    // as declared in rocm_smi.h.
    unsafe { library.get::<T>(&symbol_name) }
        .map(|symbol| *symbol)
        .map_err(|e| GpuError::SymbolMissing {
            symbol: name,
            reason: e.to_string(),
        })
}

fn out_ptr<T>(out: Option<&mut T>) -> *mut T {
    out.map_or(ptr::null_mut(), |value| value as *mut T)
}

/// ROCm SMI library loaded at runtime
pub struct RocmSmiLibrary {
    api: RsmiApi,
    // Keeps the function pointers in `api` valid; dropped after `api`.
    _library: Library,
    path: String,
}

impl RocmSmiLibrary {
    /// Load the library from `path`, or from the default locations
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let candidates: Vec<String> = match path {
            Some(path) => vec![path.display().to_string()],
            None => DEFAULT_LIBRARY_PATHS.iter().map(|p| p.to_string()).collect(),
        };
        Self::load_first(&candidates)
    }

    /// Load the first candidate that opens and exports every entry point
    fn load_first(candidates: &[String]) -> Result<Self> {
        let mut failures = Vec::new();
        for candidate in candidates {
            debug!("Trying to load ROCm SMI library from {}", candidate);
            // SAFETY: loading runs the library's initializers; librocm_smi64
            // has no initializers with preconditions on the caller.
            let library = match unsafe { Library::new(candidate) } {
                Ok(library) => library,
                Err(e) => {
                    warn!("Failed to load {}: {}", candidate, e);
                    failures.push(format!("{}: {}", candidate, e));
                    continue;
                }
            };

            match RsmiApi::resolve(&library) {
                Ok(api) => {
                    info!("Loaded ROCm SMI library from {}", candidate);
                    return Ok(Self {
                        api,
                        _library: library,
                        path: candidate.clone(),
                    });
                }
                Err(e) => {
                    warn!("Skipping {}: {}", candidate, e);
                    failures.push(format!("{}: {}", candidate, e));
                }
            }
        }

        if failures.is_empty() {
            failures.push("no library path to try".to_string());
        }
        Err(GpuError::LibraryUnavailable(failures.join("; ")))
    }

    /// Path the library was loaded from
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl SmiLibrary for RocmSmiLibrary {
    fn backend_name(&self) -> &'static str {
        "rocm"
    }

    fn init(&mut self, init_flags: u64) -> Status {
        // SAFETY: plain value argument.
        Status::from_code(unsafe { (self.api.init)(init_flags) })
    }

    fn shut_down(&mut self) -> Status {
        // SAFETY: no arguments.
        Status::from_code(unsafe { (self.api.shut_down)() })
    }

    fn num_monitor_devices(&self, num_devices: Option<&mut u32>) -> Status {
        // SAFETY: the pointer is null or borrowed from a live `&mut u32`.
        Status::from_code(unsafe { (self.api.num_monitor_devices)(out_ptr(num_devices)) })
    }

    fn dev_id(&self, dv_ind: u32, id: Option<&mut u16>) -> Status {
        // SAFETY: the pointer is null or borrowed from a live `&mut u16`.
        Status::from_code(unsafe { (self.api.dev_id_get)(dv_ind, out_ptr(id)) })
    }

    fn dev_name(&self, dv_ind: u32, name: Option<&mut String>) -> Status {
        let Some(name) = name else {
            // SAFETY: null buffer with zero length, nothing is written through it.
            return Status::from_code(unsafe {
                (self.api.dev_name_get)(dv_ind, ptr::null_mut(), 0)
            });
        };

        let mut buffer = [0 as c_char; NAME_BUFFER_LEN];
        // SAFETY: the library writes at most `NAME_BUFFER_LEN` bytes,
        // NUL-terminated, into `buffer`.
        let status = Status::from_code(unsafe {
            (self.api.dev_name_get)(dv_ind, buffer.as_mut_ptr(), NAME_BUFFER_LEN)
        });
        if status.is_success() {
            // Guarantee termination even if the library filled the buffer.
            buffer[NAME_BUFFER_LEN - 1] = 0;
            // SAFETY: `buffer` is NUL-terminated and outlives the borrow.
            let value = unsafe { CStr::from_ptr(buffer.as_ptr()) };
            *name = value.to_string_lossy().into_owned();
        }
        status
    }

    fn dev_power_cap(&self, dv_ind: u32, sensor_ind: u32, cap: Option<&mut u64>) -> Status {
        // SAFETY: the pointer is null or borrowed from a live `&mut u64`.
        Status::from_code(unsafe {
            (self.api.dev_power_cap_get)(dv_ind, sensor_ind, out_ptr(cap))
        })
    }

    fn dev_power_cap_default(&self, dv_ind: u32, default_cap: Option<&mut u64>) -> Status {
        // SAFETY: the pointer is null or borrowed from a live `&mut u64`.
        Status::from_code(unsafe {
            (self.api.dev_power_cap_default_get)(dv_ind, out_ptr(default_cap))
        })
    }

    fn dev_power_cap_range(
        &self,
        dv_ind: u32,
        sensor_ind: u32,
        max: Option<&mut u64>,
        min: Option<&mut u64>,
    ) -> Status {
        // SAFETY: both pointers are null or borrowed from live `&mut u64`s.
        Status::from_code(unsafe {
            (self.api.dev_power_cap_range_get)(dv_ind, sensor_ind, out_ptr(max), out_ptr(min))
        })
    }

    fn dev_power_ave(&self, dv_ind: u32, sensor_ind: u32, power: Option<&mut u64>) -> Status {
        // SAFETY: the pointer is null or borrowed from a live `&mut u64`.
        Status::from_code(unsafe {
            (self.api.dev_power_ave_get)(dv_ind, sensor_ind, out_ptr(power))
        })
    }

    fn status_string(&self, status: Status) -> String {
        let mut message: *const c_char = ptr::null();
        // SAFETY: `message` is a valid out-pointer; on success the library
        // stores a pointer to a static NUL-terminated string.
        let result = Status::from_code(unsafe { (self.api.status_string)(status.code(), &mut message) });
        if result.is_success() && !message.is_null() {
            // SAFETY: see above, the string is static.
            unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned()
        } else {
            status.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_is_unavailable() {
        let result = RocmSmiLibrary::load(Some(Path::new("/nonexistent/librocm_smi64.so")));
        assert!(matches!(result, Err(GpuError::LibraryUnavailable(_))));
    }

    #[test]
    fn test_incomplete_library_falls_through() {
        // libc loads fine but exports no rsmi_* symbols
        let candidates = vec![
            "libc.so.6".to_string(),
            "/nonexistent/librocm_smi64.so".to_string(),
        ];
        let err = match RocmSmiLibrary::load_first(&candidates) {
            Err(err) => err,
            Ok(_) => panic!("libc must not pass as ROCm SMI"),
        };

        let message = err.to_string();
        assert!(matches!(err, GpuError::LibraryUnavailable(_)));
        assert!(message.contains("libc.so.6: SMI library is missing symbol rsmi_init"));
        assert!(message.contains("/nonexistent/librocm_smi64.so"));
    }

    #[test]
    fn test_no_candidates() {
        let err = RocmSmiLibrary::load_first(&[]).err().map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("SMI library unavailable: no library path to try")
        );
    }

    #[test]
    fn test_out_ptr() {
        assert!(out_ptr::<u64>(None).is_null());

        let mut value = 5u64;
        let pointer = out_ptr(Some(&mut value));
        assert!(!pointer.is_null());
    }
}
