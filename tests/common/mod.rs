//! An in-process stand-in for libprism.
//!
//! Objects live in a registry keyed by synthetic handle values that are
//! never dereferenced, and nothing is ever really deallocated: releasing
//! the last reference marks the entry freed. Misuse (over-release, use
//! after free) is recorded as an anomaly a test can assert on, instead of
//! becoming undefined behavior. Every entry keeps its retain/release
//! history so ownership tests can check exact traffic.

#![allow(dead_code)]

use std::collections::HashMap;
use std::os::raw::c_char;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};

use prism::{Api, PrismGlyph, PrismIndex, PrismRect, PrismRef};

pub struct FontSpec {
    pub postscript_name: &'static str,
    pub units_per_em: i32,
    pub ascent: i32,
    pub descent: i32,
    pub leading: i32,
    pub italic_angle: f64,
    pub glyph_count: PrismIndex,
    pub bbox: PrismRect,
    /// Glyph fill calls report failure, exercising the false-return path.
    pub fill_fails: bool,
}

pub const FONTS: &[FontSpec] = &[
    FontSpec {
        postscript_name: "Menlo-Regular",
        units_per_em: 2048,
        ascent: 1901,
        descent: -483,
        leading: 67,
        italic_angle: 0.0,
        glyph_count: 3378,
        bbox: PrismRect { x: -1142.0, y: -767.0, width: 3554.0, height: 3132.0 },
        fill_fails: false,
    },
    FontSpec {
        postscript_name: "Glitch-Mono",
        units_per_em: 1000,
        ascent: 800,
        descent: -200,
        leading: 0,
        italic_angle: -12.5,
        glyph_count: 260,
        bbox: PrismRect { x: -50.0, y: -200.0, width: 700.0, height: 1000.0 },
        fill_fails: true,
    },
];

struct DeviceSpec {
    name: &'static str,
    available: bool,
}

const DEVICES: &[DeviceSpec] = &[
    DeviceSpec { name: "Stub FaceTime Camera", available: true },
    DeviceSpec { name: "Occupied Capture Device", available: false },
];

/// Expected advance for a glyph of a given font, mirroring the stub math.
pub fn expected_advance(units_per_em: i32, glyph: PrismGlyph) -> i32 {
    units_per_em / 2 + i32::from(glyph)
}

enum StubObject {
    Str(String),
    Font(&'static FontSpec),
    Device(usize),
    Input { device: usize },
    Error { domain: &'static str, code: i64, message: String },
}

struct Entry {
    refcount: isize,
    retains: u64,
    releases: u64,
    freed: bool,
    object: StubObject,
}

static NEXT_HANDLE: AtomicUsize = AtomicUsize::new(0x1000);

fn registry() -> &'static Mutex<HashMap<usize, Entry>> {
    static REGISTRY: OnceLock<Mutex<HashMap<usize, Entry>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

fn lock() -> MutexGuard<'static, HashMap<usize, Entry>> {
    registry().lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn anomaly_log() -> &'static Mutex<Vec<String>> {
    static ANOMALIES: OnceLock<Mutex<Vec<String>>> = OnceLock::new();
    ANOMALIES.get_or_init(|| Mutex::new(Vec::new()))
}

fn record_anomaly(message: String) {
    anomaly_log().lock().unwrap_or_else(|p| p.into_inner()).push(message);
}

fn alloc(object: StubObject) -> PrismRef {
    let handle = NEXT_HANDLE.fetch_add(0x10, Ordering::Relaxed);
    let entry = Entry { refcount: 1, retains: 0, releases: 0, freed: false, object };
    lock().insert(handle, entry);
    handle as PrismRef
}

/// Handles of the fixed device list, allocating them on first use. The
/// registry keeps one reference per device for the library itself, so
/// borrowed lookups hand out references the stub still owns.
fn devices() -> &'static Vec<usize> {
    static HANDLES: OnceLock<Vec<usize>> = OnceLock::new();
    HANDLES.get_or_init(|| {
        (0..DEVICES.len()).map(|i| alloc(StubObject::Device(i)) as usize).collect()
    })
}

fn str_of(raw: PrismRef) -> Option<String> {
    let map = lock();
    match map.get(&(raw as usize)) {
        Some(entry) if entry.freed => {
            record_anomaly(format!("string read after free: {:#x}", raw as usize));
            None
        }
        Some(Entry { object: StubObject::Str(text), .. }) => Some(text.clone()),
        _ => None,
    }
}

fn font_of(raw: PrismRef) -> Option<&'static FontSpec> {
    let map = lock();
    match map.get(&(raw as usize)) {
        Some(entry) if entry.freed => {
            record_anomaly(format!("font read after free: {:#x}", raw as usize));
            None
        }
        Some(Entry { object: StubObject::Font(spec), .. }) => Some(*spec),
        _ => None,
    }
}

fn device_of(raw: PrismRef) -> Option<&'static DeviceSpec> {
    let map = lock();
    match map.get(&(raw as usize)) {
        Some(Entry { object: StubObject::Device(index), freed: false, .. }) => {
            DEVICES.get(*index)
        }
        _ => None,
    }
}

extern "C" fn stub_retain(raw: PrismRef) -> PrismRef {
    let mut map = lock();
    match map.get_mut(&(raw as usize)) {
        Some(entry) if entry.freed => {
            record_anomaly(format!("retain after free: {:#x}", raw as usize));
        }
        Some(entry) => {
            entry.refcount += 1;
            entry.retains += 1;
        }
        None => {
            record_anomaly(format!("retain of unknown handle: {:#x}", raw as usize));
        }
    }
    raw
}

extern "C" fn stub_release(raw: PrismRef) {
    let mut map = lock();
    match map.get_mut(&(raw as usize)) {
        Some(entry) if entry.freed => {
            record_anomaly(format!("release after free: {:#x}", raw as usize));
        }
        Some(entry) => {
            entry.refcount -= 1;
            entry.releases += 1;
            if entry.refcount == 0 {
                entry.freed = true;
            }
        }
        None => {
            record_anomaly(format!("release of unknown handle: {:#x}", raw as usize));
        }
    }
}

extern "C" fn stub_version() -> *const c_char {
    static VERSION: &[u8] = b"1.4.2\0";
    VERSION.as_ptr() as *const c_char
}

extern "C" fn stub_string_create_utf8(bytes: *const u8, len: usize) -> PrismRef {
    if bytes.is_null() && len > 0 {
        return std::ptr::null_mut();
    }
    let text = if len == 0 {
        String::new()
    } else {
        // SAFETY: the bridge passes the pointer/length of a live &str.
        let slice = unsafe { std::slice::from_raw_parts(bytes, len) };
        String::from_utf8_lossy(slice).into_owned()
    };
    alloc(StubObject::Str(text))
}

extern "C" fn stub_string_utf8_len(raw: PrismRef) -> PrismIndex {
    match str_of(raw) {
        Some(text) => text.len() as PrismIndex,
        None => -1,
    }
}

extern "C" fn stub_string_copy_utf8(raw: PrismRef, buf: *mut u8, cap: usize) -> bool {
    let Some(text) = str_of(raw) else { return false };
    if text.len() > cap {
        return false;
    }
    if buf.is_null() {
        return text.is_empty();
    }
    // SAFETY: the bridge sized buf to at least cap bytes and cap >= len.
    unsafe { std::ptr::copy_nonoverlapping(text.as_ptr(), buf, text.len()) };
    true
}

extern "C" fn stub_font_create_named(name: PrismRef) -> PrismRef {
    let Some(wanted) = str_of(name) else { return std::ptr::null_mut() };
    match FONTS.iter().find(|spec| spec.postscript_name == wanted) {
        Some(spec) => alloc(StubObject::Font(spec)),
        None => std::ptr::null_mut(),
    }
}

extern "C" fn stub_font_units_per_em(raw: PrismRef) -> i32 {
    font_of(raw).map_or(0, |spec| spec.units_per_em)
}

extern "C" fn stub_font_glyph_count(raw: PrismRef) -> PrismIndex {
    font_of(raw).map_or(-1, |spec| spec.glyph_count)
}

extern "C" fn stub_font_ascent(raw: PrismRef) -> i32 {
    font_of(raw).map_or(0, |spec| spec.ascent)
}

extern "C" fn stub_font_descent(raw: PrismRef) -> i32 {
    font_of(raw).map_or(0, |spec| spec.descent)
}

extern "C" fn stub_font_leading(raw: PrismRef) -> i32 {
    font_of(raw).map_or(0, |spec| spec.leading)
}

extern "C" fn stub_font_italic_angle(raw: PrismRef) -> f64 {
    font_of(raw).map_or(0.0, |spec| spec.italic_angle)
}

extern "C" fn stub_font_copy_name(raw: PrismRef) -> PrismRef {
    match font_of(raw) {
        Some(spec) => alloc(StubObject::Str(spec.postscript_name.to_string())),
        None => std::ptr::null_mut(),
    }
}

fn glyph_for_name(name: &str) -> PrismGlyph {
    match name {
        "space" => 3,
        "A" => 36,
        "B" => 37,
        _ => 0,
    }
}

fn name_for_glyph(glyph: PrismGlyph) -> Option<&'static str> {
    match glyph {
        3 => Some("space"),
        36 => Some("A"),
        37 => Some("B"),
        _ => None,
    }
}

extern "C" fn stub_font_glyph_named(raw: PrismRef, name: PrismRef) -> PrismGlyph {
    if font_of(raw).is_none() {
        return 0;
    }
    str_of(name).map_or(0, |text| glyph_for_name(&text))
}

extern "C" fn stub_font_copy_glyph_name(raw: PrismRef, glyph: PrismGlyph) -> PrismRef {
    if font_of(raw).is_none() {
        return std::ptr::null_mut();
    }
    match name_for_glyph(glyph) {
        Some(name) => alloc(StubObject::Str(name.to_string())),
        None => std::ptr::null_mut(),
    }
}

extern "C" fn stub_font_glyph_advances(
    raw: PrismRef,
    glyphs: *const PrismGlyph,
    count: PrismIndex,
    advances: *mut i32,
) -> bool {
    let Some(spec) = font_of(raw) else { return false };
    if spec.fill_fails || count < 0 {
        return false;
    }
    let count = count as usize;
    if count == 0 {
        return true;
    }
    if glyphs.is_null() || advances.is_null() {
        return false;
    }
    // SAFETY: the bridge validated both buffers against count.
    unsafe {
        let glyphs = std::slice::from_raw_parts(glyphs, count);
        let advances = std::slice::from_raw_parts_mut(advances, count);
        for (advance, glyph) in advances.iter_mut().zip(glyphs) {
            *advance = expected_advance(spec.units_per_em, *glyph);
        }
    }
    true
}

extern "C" fn stub_font_glyph_bounds(
    raw: PrismRef,
    glyphs: *const PrismGlyph,
    count: PrismIndex,
    bounds: *mut PrismRect,
) -> bool {
    let Some(spec) = font_of(raw) else { return false };
    if spec.fill_fails || count < 0 {
        return false;
    }
    let count = count as usize;
    if count == 0 {
        return true;
    }
    if glyphs.is_null() || bounds.is_null() {
        return false;
    }
    // SAFETY: the bridge validated both buffers against count.
    unsafe {
        let glyphs = std::slice::from_raw_parts(glyphs, count);
        let bounds = std::slice::from_raw_parts_mut(bounds, count);
        for (rect, glyph) in bounds.iter_mut().zip(glyphs) {
            *rect = PrismRect {
                x: 0.0,
                y: f64::from(spec.descent),
                width: f64::from(expected_advance(spec.units_per_em, *glyph)),
                height: f64::from(spec.ascent - spec.descent),
            };
        }
    }
    true
}

extern "C" fn stub_font_bounding_box(raw: PrismRef, out: *mut PrismRect) -> bool {
    let Some(spec) = font_of(raw) else { return false };
    if out.is_null() {
        return false;
    }
    // SAFETY: the bridge passes a live out-pointer.
    unsafe { *out = spec.bbox };
    true
}

extern "C" fn stub_capture_device_count() -> PrismIndex {
    devices().len() as PrismIndex
}

extern "C" fn stub_capture_device_at(index: PrismIndex) -> PrismRef {
    if index < 0 {
        return std::ptr::null_mut();
    }
    devices().get(index as usize).map_or(std::ptr::null_mut(), |&handle| handle as PrismRef)
}

extern "C" fn stub_capture_default_device() -> PrismRef {
    devices()[0] as PrismRef
}

extern "C" fn stub_capture_device_name(raw: PrismRef) -> PrismRef {
    match device_of(raw) {
        Some(spec) => alloc(StubObject::Str(spec.name.to_string())),
        None => std::ptr::null_mut(),
    }
}

extern "C" fn stub_capture_input_create(raw: PrismRef, out_error: *mut PrismRef) -> PrismRef {
    let Some(spec) = device_of(raw) else {
        let error = alloc(StubObject::Error {
            domain: "PrismCapture",
            code: -11814,
            message: "device not found".to_string(),
        });
        // SAFETY: the bridge passes a live out-pointer.
        unsafe { *out_error = error };
        return std::ptr::null_mut();
    };
    if !spec.available {
        let error = alloc(StubObject::Error {
            domain: "PrismCapture",
            code: -11852,
            message: format!("{} is in use by another client", spec.name),
        });
        // SAFETY: the bridge passes a live out-pointer.
        unsafe { *out_error = error };
        return std::ptr::null_mut();
    }
    alloc(StubObject::Input { device: raw as usize })
}

extern "C" fn stub_error_domain(raw: PrismRef) -> PrismRef {
    // The registry guard must end before alloc retakes the lock.
    let domain = {
        let map = lock();
        match map.get(&(raw as usize)) {
            Some(Entry { object: StubObject::Error { domain, .. }, freed: false, .. }) => {
                Some(*domain)
            }
            _ => None,
        }
    };
    match domain {
        Some(domain) => alloc(StubObject::Str(domain.to_string())),
        None => std::ptr::null_mut(),
    }
}

extern "C" fn stub_error_code(raw: PrismRef) -> i64 {
    let map = lock();
    match map.get(&(raw as usize)) {
        Some(Entry { object: StubObject::Error { code, .. }, freed: false, .. }) => *code,
        _ => 0,
    }
}

extern "C" fn stub_error_message(raw: PrismRef) -> PrismRef {
    let message = {
        let map = lock();
        match map.get(&(raw as usize)) {
            Some(Entry { object: StubObject::Error { message, .. }, freed: false, .. }) => {
                Some(message.clone())
            }
            _ => None,
        }
    };
    match message {
        Some(message) => alloc(StubObject::Str(message)),
        None => std::ptr::null_mut(),
    }
}

/// The full stub entry-point table.
pub fn stub_api() -> Api {
    Api {
        retain: stub_retain,
        release: stub_release,
        version: stub_version,
        string_create_utf8: stub_string_create_utf8,
        string_utf8_len: stub_string_utf8_len,
        string_copy_utf8: stub_string_copy_utf8,
        font_create_named: stub_font_create_named,
        font_units_per_em: stub_font_units_per_em,
        font_glyph_count: stub_font_glyph_count,
        font_ascent: stub_font_ascent,
        font_descent: stub_font_descent,
        font_leading: stub_font_leading,
        font_italic_angle: stub_font_italic_angle,
        font_copy_name: stub_font_copy_name,
        font_glyph_named: stub_font_glyph_named,
        font_copy_glyph_name: stub_font_copy_glyph_name,
        font_glyph_advances: stub_font_glyph_advances,
        font_glyph_bounds: stub_font_glyph_bounds,
        font_bounding_box: stub_font_bounding_box,
        capture_device_count: stub_capture_device_count,
        capture_device_at: stub_capture_device_at,
        capture_default_device: stub_capture_default_device,
        capture_device_name: stub_capture_device_name,
        capture_input_create: stub_capture_input_create,
        error_domain: stub_error_domain,
        error_code: stub_error_code,
        error_message: stub_error_message,
    }
}

// Override entry points for misbehaving-library tests. Patch these over a
// copy of `stub_api()` before handing it to `Library::from_api`.

pub extern "C" fn stub_no_default_device() -> PrismRef {
    std::ptr::null_mut()
}

pub extern "C" fn stub_negative_utf8_len(_raw: PrismRef) -> PrismIndex {
    -1
}

pub extern "C" fn stub_mojibake_copy_utf8(_raw: PrismRef, buf: *mut u8, cap: usize) -> bool {
    if buf.is_null() {
        return cap == 0;
    }
    // SAFETY: the bridge sized buf to cap bytes.
    unsafe { std::ptr::write_bytes(buf, 0xFF, cap) };
    true
}

pub extern "C" fn stub_failing_string_create(_bytes: *const u8, _len: usize) -> PrismRef {
    std::ptr::null_mut()
}

pub extern "C" fn stub_null_version() -> *const c_char {
    std::ptr::null()
}

// Ledger accessors for assertions.

pub fn retains_of(raw: PrismRef) -> u64 {
    lock().get(&(raw as usize)).map_or(0, |entry| entry.retains)
}

pub fn releases_of(raw: PrismRef) -> u64 {
    lock().get(&(raw as usize)).map_or(0, |entry| entry.releases)
}

pub fn refcount_of(raw: PrismRef) -> isize {
    lock().get(&(raw as usize)).map_or(-1, |entry| entry.refcount)
}

pub fn is_freed(raw: PrismRef) -> bool {
    lock().get(&(raw as usize)).is_some_and(|entry| entry.freed)
}

pub fn anomalies() -> Vec<String> {
    anomaly_log().lock().unwrap_or_else(|p| p.into_inner()).clone()
}

/// Allocate a bare string object and hand its creation reference to the
/// caller, the way a creating native call would.
pub fn alloc_raw(text: &str) -> PrismRef {
    alloc(StubObject::Str(text.to_string()))
}

/// Release a reference the test itself owns.
pub fn release_raw(raw: PrismRef) {
    stub_release(raw);
}

/// Serializes tests that assert on the shared device entries.
pub fn device_ledger_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
