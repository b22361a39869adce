//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`RulesStore`]: the rules document is kept as JSON text in a
//! single blob (namespace `relaybox`, key `rules`), the same text the HTTP
//! collaborator serves for backup.
//!
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`, so a
//!   power cut mid-save leaves the previous document readable.
//! - On host targets a single in-memory slot stands in for flash.

use log::{info, warn};

use crate::app::ports::RulesStore;
use crate::config::RulesDocument;
use crate::error::StoreError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

pub const RULES_NAMESPACE: &str = "relaybox";
pub const RULES_KEY: &str = "rules";

#[cfg(target_os = "espidf")]
const NAMESPACE_C: &core::ffi::CStr = c"relaybox";
#[cfg(target_os = "espidf")]
const KEY_C: &core::ffi::CStr = c"rules";

const MAX_BLOB_SIZE: usize = 16 * 1024;

pub struct NvsAdapter {
    /// Simulated flash: the single rules blob.
    #[cfg(not(target_os = "espidf"))]
    blob: Option<Vec<u8>>,
}

/// Open namespace handle, closed on drop.
#[cfg(target_os = "espidf")]
struct Handle(nvs_handle_t);

#[cfg(target_os = "espidf")]
impl Handle {
    fn open(write: bool) -> Result<Self, esp_err_t> {
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut raw: nvs_handle_t = 0;
        // SAFETY: NAMESPACE_C is NUL-terminated and `raw` outlives the call.
        match unsafe { nvs_open(NAMESPACE_C.as_ptr(), mode, &mut raw) } {
            ESP_OK => Ok(Self(raw)),
            err => Err(err),
        }
    }

    fn read_blob(&self) -> Result<Vec<u8>, esp_err_t> {
        let mut size: usize = 0;
        // SAFETY: a null buffer asks NVS for the stored length only.
        let ret = unsafe { nvs_get_blob(self.0, KEY_C.as_ptr(), core::ptr::null_mut(), &mut size) };
        if ret != ESP_OK {
            return Err(ret);
        }
        if size == 0 || size > MAX_BLOB_SIZE {
            return Err(ESP_ERR_NVS_INVALID_LENGTH);
        }

        let mut buf = vec![0u8; size];
        // SAFETY: `buf` holds exactly `size` bytes.
        let ret = unsafe { nvs_get_blob(self.0, KEY_C.as_ptr(), buf.as_mut_ptr().cast(), &mut size) };
        if ret != ESP_OK {
            return Err(ret);
        }
        buf.truncate(size);
        Ok(buf)
    }

    fn write_blob(&self, bytes: &[u8]) -> Result<(), esp_err_t> {
        // SAFETY: pointer and length come from the same slice.
        let ret = unsafe { nvs_set_blob(self.0, KEY_C.as_ptr(), bytes.as_ptr().cast(), bytes.len()) };
        if ret != ESP_OK {
            return Err(ret);
        }
        // SAFETY: handle is open read-write.
        match unsafe { nvs_commit(self.0) } {
            ESP_OK => Ok(()),
            err => Err(err),
        }
    }
}

#[cfg(target_os = "espidf")]
impl Drop for Handle {
    fn drop(&mut self) {
        // SAFETY: the handle was returned by a successful nvs_open.
        unsafe { nvs_close(self.0) };
    }
}

impl NvsAdapter {
    /// Initialise NVS flash.  A partition that is full or was written by a
    /// newer IDF is erased first.
    pub fn new() -> Result<Self, StoreError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any other NVS use.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NvsAdapter: partition unusable ({}), erasing", ret);
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(StoreError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(StoreError::IoError);
            }
            info!("NvsAdapter: flash ready (namespace '{}')", RULES_NAMESPACE);
            Ok(Self {})
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("NvsAdapter: in-memory rules store");
            Ok(Self { blob: None })
        }
    }

    /// Replace the stored blob with raw bytes, bypassing serialisation.
    #[cfg(not(target_os = "espidf"))]
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.blob = Some(bytes.to_vec());
    }

    fn decode(bytes: &[u8]) -> Result<RulesDocument, StoreError> {
        let text = core::str::from_utf8(bytes).map_err(|_| StoreError::Corrupted)?;
        RulesDocument::from_json(text).map_err(|_| StoreError::Corrupted)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_bytes(&self) -> Result<Vec<u8>, StoreError> {
        self.blob.clone().ok_or(StoreError::NotFound)
    }

    #[cfg(target_os = "espidf")]
    fn read_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Handle::open(false)
            .and_then(|h| h.read_blob())
            .map_err(|err| match err {
                ESP_ERR_NVS_NOT_FOUND => StoreError::NotFound,
                ESP_ERR_NVS_INVALID_LENGTH => StoreError::Corrupted,
                other => {
                    warn!("NvsAdapter: read of '{}' failed ({})", RULES_KEY, other);
                    StoreError::IoError
                }
            })
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_bytes(&mut self, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.blob = Some(bytes);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn write_bytes(&mut self, bytes: Vec<u8>) -> Result<(), StoreError> {
        Handle::open(true)
            .and_then(|h| h.write_blob(&bytes))
            .map_err(|err| match err {
                ESP_ERR_NVS_NOT_ENOUGH_SPACE => StoreError::Full,
                other => {
                    warn!("NvsAdapter: write of '{}' failed ({})", RULES_KEY, other);
                    StoreError::IoError
                }
            })
    }
}

impl RulesStore for NvsAdapter {
    fn load(&self) -> Result<RulesDocument, StoreError> {
        let bytes = self.read_bytes()?;
        let doc = Self::decode(&bytes)?;
        info!("NvsAdapter: loaded rules ({} bytes)", bytes.len());
        Ok(doc)
    }

    fn save(&mut self, doc: &RulesDocument) -> Result<(), StoreError> {
        let text = doc.to_json().map_err(|_| StoreError::IoError)?;
        if text.len() > MAX_BLOB_SIZE {
            warn!("NvsAdapter: rules document too large ({} bytes)", text.len());
            return Err(StoreError::Full);
        }
        let len = text.len();
        self.write_bytes(text.into_bytes())?;
        info!("NvsAdapter: rules saved ({} bytes)", len);
        Ok(())
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::config::ShutterEntry;

    #[test]
    fn first_boot_is_not_found() {
        assert_eq!(NvsAdapter::new().unwrap().load(), Err(StoreError::NotFound));
    }

    #[test]
    fn save_then_load() {
        let mut nvs = NvsAdapter::new().unwrap();
        let mut doc = RulesDocument::default_for(4, 4);
        doc.shutters.push(ShutterEntry::default_for(1));
        nvs.save(&doc).unwrap();
        assert_eq!(nvs.load(), Ok(doc));
    }

    #[test]
    fn garbage_is_corrupted() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.put_raw(b"{\"relays\": [");
        assert_eq!(nvs.load(), Err(StoreError::Corrupted));
        nvs.put_raw(&[0xFF, 0xFE]);
        assert_eq!(nvs.load(), Err(StoreError::Corrupted));
    }
}
