//! BLE link adapter.
//!
//! Implements [`RemoteLinkPort`], the hexagonal boundary for the single
//! connected peer that reads telemetry and issues servo commands.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid BLE GATT server via raw `esp_idf_svc::sys`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID                                     | Perms        |
//! |----------------|------------------------------------------|--------------|
//! | Sensor         | `6e400003-b5a3-f393-e0a9-e50e24dcca9e`   | Read+Notify  |
//! | Control        | `6e400004-b5a3-f393-e0a9-e50e24dcca9e`   | Write        |
//!
//! The Bluedroid callbacks never touch domain state.  Connects,
//! disconnects and control writes are timestamped and pushed into
//! [`LINK_EVENTS`](crate::link::LINK_EVENTS); the control loop feeds them
//! back into this adapter through the port trait.

use log::{info, warn};

use crate::app::ports::RemoteLinkPort;
use crate::error::LinkError;

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x6e400001_b5a3_f393_e0a9_e50e24dcca9e;
pub const CHAR_SENSOR: u128 = 0x6e400003_b5a3_f393_e0a9_e50e24dcca9e;
pub const CHAR_CONTROL: u128 = 0x6e400004_b5a3_f393_e0a9_e50e24dcca9e;

/// Default ATT MTU (23) minus the 3-byte notification header.
pub const MAX_NOTIFY_LEN: usize = 20;

// ───────────────────────────────────────────────────────────────
// BLE state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Connected,
    Failed,
}

// ── ESP-IDF BLE static state ──────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures. These atomics bridge the callback context to the adapter.

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering as AtomicOrdering};

#[cfg(target_os = "espidf")]
static BLE_GATTS_IF: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_SENSOR_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CONTROL_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CHAR_STEP: AtomicU32 = AtomicU32::new(0);
/// Scan response configured; advertising may start.
#[cfg(target_os = "espidf")]
static BLE_ADV_READY: AtomicBool = AtomicBool::new(false);
/// `advertise()` was called before the scan response was ready.
#[cfg(target_os = "espidf")]
static BLE_ADV_PENDING: AtomicBool = AtomicBool::new(false);

#[cfg(target_os = "espidf")]
static SERVICE_UUID_LE: [u8; 16] = SERVICE_UUID.to_le_bytes();

#[cfg(target_os = "espidf")]
fn uuid128_to_esp(uuid: u128) -> esp_idf_svc::sys::esp_bt_uuid_t {
    // SAFETY: esp_bt_uuid_t is a plain C struct/union; all-zero is valid.
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 16;
    t.uuid.uuid128 = uuid.to_le_bytes();
    t
}

#[cfg(target_os = "espidf")]
fn uuid16_to_esp(uuid: u16) -> esp_idf_svc::sys::esp_bt_uuid_t {
    // SAFETY: see uuid128_to_esp.
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 2;
    t.uuid.uuid16 = uuid;
    t
}

/// Add a characteristic.  `stack_value_len` makes the stack own the value
/// (auto-response reads); `None` leaves reads and writes to the app.
#[cfg(target_os = "espidf")]
unsafe fn add_gatt_char(svc_handle: u16, uuid: u128, perm: u32, prop: u32, stack_value_len: Option<u16>) {
    use esp_idf_svc::sys::*;
    static EMPTY: [u8; MAX_NOTIFY_LEN] = [0; MAX_NOTIFY_LEN];

    let mut char_uuid = uuid128_to_esp(uuid);
    let mut value = esp_attr_value_t {
        attr_max_len: stack_value_len.unwrap_or(0),
        attr_len: 0,
        attr_value: EMPTY.as_ptr().cast_mut(),
    };
    let mut control = esp_attr_control_t {
        auto_rsp: ESP_GATT_AUTO_RSP as u8,
    };
    let (value_ptr, control_ptr) = if stack_value_len.is_some() {
        (&raw mut value, &raw mut control)
    } else {
        (core::ptr::null_mut(), core::ptr::null_mut())
    };
    // SAFETY: the stack deep-copies value/control before returning.
    let ret = unsafe {
        esp_ble_gatts_add_char(
            svc_handle,
            &mut char_uuid,
            perm as esp_gatt_perm_t,
            prop as esp_gatt_char_prop_t,
            value_ptr,
            control_ptr,
        )
    };
    if ret != ESP_OK as i32 {
        log::error!("BLE GATTS: add_char failed ({})", ret);
    }
}

#[cfg(target_os = "espidf")]
unsafe fn start_advertising() {
    use esp_idf_svc::sys::*;
    // SAFETY: all-zero is a valid starting point for the remaining fields.
    let mut adv_params = esp_ble_adv_params_t {
        adv_int_min: 0x20,
        adv_int_max: 0x40,
        adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
        own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
        channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
        adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
        ..unsafe { core::mem::zeroed() }
    };
    unsafe { esp_ble_gap_start_advertising(&mut adv_params) };
}

#[cfg(target_os = "espidf")]
fn timer_ms() -> u64 {
    // SAFETY: esp_timer_get_time is a monotonic counter read.
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() } / 1_000) as u64
}

#[cfg(target_os = "espidf")]
fn push(event: crate::link::LinkEvent) {
    if !crate::link::LINK_EVENTS.push(event) {
        log::warn!("BLE: link queue full, oldest write dropped");
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RSP_DATA_SET_COMPLETE_EVT => {
            BLE_ADV_READY.store(true, AtomicOrdering::Release);
            if BLE_ADV_PENDING.swap(false, AtomicOrdering::AcqRel) {
                // SAFETY: called from the Bluedroid task after stack init.
                unsafe { start_advertising() };
            }
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            // SAFETY: param is valid for the duration of the callback.
            let status = unsafe { (*param).adv_start_cmpl.status };
            if status == esp_bt_status_t_ESP_BT_STATUS_SUCCESS {
                log::info!("BLE GAP: advertising started");
            } else {
                log::warn!("BLE GAP: advertising start failed (status={})", status);
            }
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use esp_idf_svc::sys::*;

    // SAFETY: Bluedroid guarantees `param` is valid for the duration of
    // the callback; every FFI call below runs on the Bluedroid task.
    unsafe {
        match event {
            esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                BLE_GATTS_IF.store(u32::from(gatts_if), AtomicOrdering::Relaxed);
                log::info!("BLE GATTS: app registered (if={})", gatts_if);
                let mut svc_id = esp_gatt_srvc_id_t {
                    id: esp_gatt_id_t {
                        uuid: uuid128_to_esp(SERVICE_UUID),
                        inst_id: 0,
                    },
                    is_primary: true,
                };
                // service + 2 × (decl + value) + CCCD
                esp_ble_gatts_create_service(gatts_if, &mut svc_id, 8);
            }
            esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
                let svc_handle = (*param).create.service_handle;
                BLE_SVC_HANDLE.store(u32::from(svc_handle), AtomicOrdering::Relaxed);
                log::info!("BLE GATTS: service created (handle={})", svc_handle);
                esp_ble_gatts_start_service(svc_handle);
                BLE_CHAR_STEP.store(1, AtomicOrdering::Relaxed);
                add_gatt_char(
                    svc_handle,
                    CHAR_SENSOR,
                    ESP_GATT_PERM_READ,
                    ESP_GATT_CHAR_PROP_BIT_READ | ESP_GATT_CHAR_PROP_BIT_NOTIFY,
                    Some(MAX_NOTIFY_LEN as u16),
                );
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
                let handle = (*param).add_char.attr_handle;
                let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
                match BLE_CHAR_STEP.load(AtomicOrdering::Relaxed) {
                    1 => {
                        BLE_SENSOR_CHAR_HANDLE.store(u32::from(handle), AtomicOrdering::Relaxed);
                        log::info!("BLE GATTS: sensor char (handle={})", handle);
                        BLE_CHAR_STEP.store(2, AtomicOrdering::Relaxed);
                        let mut cccd = uuid16_to_esp(ESP_GATT_UUID_CHAR_CLIENT_CONFIG as u16);
                        esp_ble_gatts_add_char_descr(
                            svc_handle,
                            &mut cccd,
                            (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
                            core::ptr::null_mut(),
                            core::ptr::null_mut(),
                        );
                    }
                    3 => {
                        BLE_CONTROL_CHAR_HANDLE.store(u32::from(handle), AtomicOrdering::Relaxed);
                        BLE_CHAR_STEP.store(4, AtomicOrdering::Relaxed);
                        log::info!("BLE GATTS: control char (handle={}), service ready", handle);
                    }
                    _ => {}
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
                if BLE_CHAR_STEP.load(AtomicOrdering::Relaxed) == 2 {
                    BLE_CHAR_STEP.store(3, AtomicOrdering::Relaxed);
                    add_gatt_char(
                        BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16,
                        CHAR_CONTROL,
                        ESP_GATT_PERM_WRITE,
                        ESP_GATT_CHAR_PROP_BIT_WRITE | ESP_GATT_CHAR_PROP_BIT_WRITE_NR,
                        None,
                    );
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                let conn_id = (*param).connect.conn_id;
                push(crate::link::LinkEvent::Connected { conn_id });
            }
            esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                push(crate::link::LinkEvent::Disconnected);
            }
            esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
                let p = &(*param).write;
                if u32::from(p.handle) == BLE_CONTROL_CHAR_HANDLE.load(AtomicOrdering::Relaxed)
                    && !p.value.is_null()
                {
                    let data = core::slice::from_raw_parts(p.value, usize::from(p.len));
                    push(crate::link::LinkEvent::write(data, timer_ms()));
                }
                if p.need_rsp {
                    esp_ble_gatts_send_response(
                        gatts_if,
                        p.conn_id,
                        p.trans_id,
                        esp_gatt_status_t_ESP_GATT_OK,
                        core::ptr::null_mut(),
                    );
                }
            }
            _ => {}
        }
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

pub struct BleLink {
    state: BleState,
    conn_id: Option<u16>,
    device_name: heapless::String<24>,
    last_payload: heapless::String<MAX_NOTIFY_LEN>,
    notify_count: u32,
    advertise_count: u32,
}

impl BleLink {
    pub fn new(device_name: heapless::String<24>) -> Self {
        Self {
            state: BleState::Idle,
            conn_id: None,
            device_name,
            last_payload: heapless::String::new(),
            notify_count: 0,
            advertise_count: 0,
        }
    }

    /// Bring up the controller and register the GATT service.  Advertising
    /// starts on the first [`advertise`](RemoteLinkPort::advertise).
    pub fn start(&mut self) -> Result<(), LinkError> {
        info!("BLE: starting stack as '{}'", self.device_name);
        if let Err(e) = self.platform_start() {
            self.state = BleState::Failed;
            return Err(e);
        }
        Ok(())
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    /// Last payload handed to the stack.
    pub fn last_payload(&self) -> &str {
        &self.last_payload
    }

    pub fn notify_count(&self) -> u32 {
        self.notify_count
    }

    pub fn advertise_count(&self) -> u32 {
        self.advertise_count
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self) -> Result<(), LinkError> {
        use esp_idf_svc::sys::*;
        // SAFETY: called once from main before the control loop starts.
        unsafe {
            // Release classic BT memory (BLE-only mode saves ~30 KB).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_init failed ({})", ret);
                return Err(LinkError::StackInitFailed);
            }

            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_enable failed ({})", ret);
                return Err(LinkError::StackInitFailed);
            }

            let ret = esp_bluedroid_init();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_init failed ({})", ret);
                return Err(LinkError::StackInitFailed);
            }

            let ret = esp_bluedroid_enable();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_enable failed ({})", ret);
                return Err(LinkError::StackInitFailed);
            }

            esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
            esp_ble_gatts_app_register(0);

            // NUL-terminated copy for the C API.
            let mut name: heapless::Vec<u8, 25> = heapless::Vec::new();
            let _ = name.extend_from_slice(self.device_name.as_bytes());
            let _ = name.push(0);
            esp_ble_gap_set_device_name(name.as_ptr().cast());

            // Name in the advertisement, service UUID in the scan response
            // (both together exceed 31 bytes).
            let mut adv_data = esp_ble_adv_data_t {
                set_scan_rsp: false,
                include_name: true,
                flag: (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8,
                ..core::mem::zeroed()
            };
            esp_ble_gap_config_adv_data(&mut adv_data);

            let mut scan_rsp = esp_ble_adv_data_t {
                set_scan_rsp: true,
                service_uuid_len: SERVICE_UUID_LE.len() as u16,
                p_service_uuid: SERVICE_UUID_LE.as_ptr().cast_mut(),
                ..core::mem::zeroed()
            };
            esp_ble_gap_config_adv_data(&mut scan_rsp);
        }
        info!("BLE(espidf): Bluedroid stack initialized");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self) -> Result<(), LinkError> {
        info!(
            "BLE(sim): stack up as '{}' (service {:032x})",
            self.device_name, SERVICE_UUID
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_advertise(&mut self) {
        if BLE_ADV_READY.load(AtomicOrdering::Acquire) {
            // SAFETY: stack is initialised (state != Idle/Failed).
            unsafe { start_advertising() };
        } else {
            BLE_ADV_PENDING.store(true, AtomicOrdering::Release);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_advertise(&mut self) {
        info!("BLE(sim): advertising '{}'", self.device_name);
    }

    #[cfg(target_os = "espidf")]
    fn platform_notify(&mut self, conn_id: u16, payload: &str) -> Result<(), LinkError> {
        use esp_idf_svc::sys::*;
        let handle = BLE_SENSOR_CHAR_HANDLE.load(AtomicOrdering::Relaxed) as u16;
        if handle == 0 {
            return Err(LinkError::NotConnected);
        }
        let len = payload.len() as u16;
        // SAFETY: payload outlives both calls; the stack copies the bytes.
        unsafe {
            let ret = esp_ble_gatts_set_attr_value(handle, len, payload.as_ptr());
            if ret != ESP_OK as i32 {
                return Err(LinkError::NotifyFailed(ret));
            }
            let ret = esp_ble_gatts_send_indicate(
                BLE_GATTS_IF.load(AtomicOrdering::Relaxed) as esp_gatt_if_t,
                conn_id,
                handle,
                len,
                payload.as_ptr().cast_mut(),
                false,
            );
            if ret != ESP_OK as i32 {
                return Err(LinkError::NotifyFailed(ret));
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_notify(&mut self, conn_id: u16, payload: &str) -> Result<(), LinkError> {
        log::debug!("BLE(sim): notify conn={} '{}'", conn_id, payload);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// RemoteLinkPort implementation
// ───────────────────────────────────────────────────────────────

impl RemoteLinkPort for BleLink {
    fn on_peer_connected(&mut self, conn_id: u16) {
        info!("BLE: central connected (conn_id={})", conn_id);
        self.conn_id = Some(conn_id);
        self.state = BleState::Connected;
    }

    fn on_peer_disconnected(&mut self) {
        info!("BLE: central disconnected");
        self.conn_id = None;
        if self.state == BleState::Connected {
            self.state = BleState::Idle;
        }
    }

    fn advertise(&mut self) {
        if matches!(self.state, BleState::Failed | BleState::Connected) {
            return;
        }
        self.platform_advertise();
        self.advertise_count += 1;
        self.state = BleState::Advertising;
    }

    fn is_connected(&self) -> bool {
        self.conn_id.is_some()
    }

    fn notify(&mut self, payload: &str) -> Result<(), LinkError> {
        let conn_id = self.conn_id.ok_or(LinkError::NotConnected)?;
        if payload.len() > MAX_NOTIFY_LEN {
            warn!("BLE: payload too long ({} > {})", payload.len(), MAX_NOTIFY_LEN);
            return Err(LinkError::PayloadTooLong);
        }
        self.platform_notify(conn_id, payload)?;
        self.last_payload.clear();
        // Cannot fail: length checked above.
        let _ = self.last_payload.push_str(payload);
        self.notify_count += 1;
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
