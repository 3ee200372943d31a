//! The Win32 overlay window
//!
//! Implements the [`MainWindow`] capability interface over a layered popup
//! window. The client area is painted black and blur-behind is enabled with
//! an off-screen region, which the compositor turns into a translucent
//! backdrop while text drawn on top stays opaque. Gestures and geometry
//! notifications are posted to the controller's UI queue rather than calling
//! into the controller from the window procedure.

#![allow(dead_code)]

use anyhow::Result;
use log::{debug, info};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::cell::Cell;
use std::sync::Arc;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, CreateFontW, CreateSolidBrush, DeleteObject, DrawTextW, EndPaint, FillRect,
    GetStockObject, InvalidateRect, SelectObject, SetBkMode, SetTextColor, BLACK_BRUSH,
    CLEARTYPE_QUALITY, CLIP_DEFAULT_PRECIS, DEFAULT_CHARSET, DT_CENTER, DT_SINGLELINE,
    DT_VCENTER, FF_DONTCARE, HBRUSH, HDC, OUT_DEFAULT_PRECIS, PAINTSTRUCT, TRANSPARENT,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::HiDpi::GetDpiForWindow;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, GetWindowRect, LoadCursorW, PostMessageW,
    PostQuitMessage, RegisterClassExW, SetWindowPos, ShowWindow, CS_DBLCLKS, CS_HREDRAW,
    CS_VREDRAW, IDC_ARROW, SWP_NOACTIVATE, SWP_NOZORDER, SW_SHOWNOACTIVATE, WM_ACTIVATE,
    WM_APP, WM_CLOSE, WM_CREATE, WM_DESTROY, WM_ERASEBKGND, WM_LBUTTONDBLCLK, WM_PAINT,
    WM_WINDOWPOSCHANGED, WNDCLASSEXW, WS_EX_LAYERED, WS_OVERLAPPEDWINDOW,
};

use crate::bounds::{FrameAdjustment, WindowBounds};
use crate::events::{UiDispatcher, UiMessage};
use crate::settings::{AppearanceSettings, Color, FontDefinition, FontWeight};
use crate::window::native;
use crate::window::MainWindow;

const WINDOW_CLASS: &str = "LifeTimerOverlayClass";
const WINDOW_TITLE: &str = "LifeTimer";

/// Posted to pump the message loop when background threads enqueue work.
pub const WM_LIFETIMER_WAKE: u32 = WM_APP + 1;

const HINT_TEXT: &str = "Double-click to toggle interactive mode";

/// State the window procedure needs (thread-safe parts only).
struct OverlayState {
    dispatcher: UiDispatcher,
    appearance: AppearanceSettings,
    title_text: String,
    time_text: String,
    nag_text: Option<String>,
    hint_text: Option<String>,
    activated: bool,
}

static OVERLAY_STATE: OnceCell<Arc<RwLock<OverlayState>>> = OnceCell::new();

fn get_overlay_state() -> Option<Arc<RwLock<OverlayState>>> {
    OVERLAY_STATE.get().cloned()
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

pub struct OverlayWindow {
    hwnd: HWND,
    state: Arc<RwLock<OverlayState>>,
    frame_adjustment: Cell<Option<FrameAdjustment>>,
}

impl OverlayWindow {
    /// Register the class, create the layered window and wire the dispatcher
    /// waker so queued messages pump the blocking message loop.
    pub fn create(dispatcher: UiDispatcher) -> Result<Self> {
        let state = Arc::new(RwLock::new(OverlayState {
            dispatcher: dispatcher.clone(),
            appearance: AppearanceSettings::default(),
            title_text: String::new(),
            time_text: String::new(),
            nag_text: None,
            hint_text: None,
            activated: false,
        }));
        let _ = OVERLAY_STATE.set(state.clone());

        let class_name = to_wide(WINDOW_CLASS);
        Self::register_window_class(&class_name)?;
        let hwnd = Self::create_window(&class_name)?;

        // Wake the GetMessageW loop whenever a background thread posts.
        let raw_hwnd = hwnd.0 as isize;
        dispatcher.set_waker(move || unsafe {
            let _ = PostMessageW(
                HWND(raw_hwnd as *mut _),
                WM_LIFETIMER_WAKE,
                WPARAM(0),
                LPARAM(0),
            );
        });

        native::enable_blur_behind(hwnd);

        info!("Overlay window created");
        Ok(Self {
            hwnd,
            state,
            frame_adjustment: Cell::new(None),
        })
    }

    fn register_window_class(class_name: &[u16]) -> Result<()> {
        unsafe {
            let hinstance = GetModuleHandleW(None)?;

            let wc = WNDCLASSEXW {
                cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
                style: CS_HREDRAW | CS_VREDRAW | CS_DBLCLKS,
                lpfnWndProc: Some(window_proc),
                hInstance: hinstance.into(),
                hCursor: LoadCursorW(None, IDC_ARROW)?,
                lpszClassName: PCWSTR(class_name.as_ptr()),
                hbrBackground: HBRUSH::default(),
                ..Default::default()
            };

            let atom = RegisterClassExW(&wc);
            if atom == 0 {
                return Err(anyhow::anyhow!("Failed to register window class"));
            }
        }
        Ok(())
    }

    fn create_window(class_name: &[u16]) -> Result<HWND> {
        let title = to_wide(WINDOW_TITLE);

        unsafe {
            let hinstance = GetModuleHandleW(None)?;

            // Created framed; pre-main initialisation applies the persisted
            // mode and bounds before the window is shown.
            let hwnd = CreateWindowExW(
                WS_EX_LAYERED,
                PCWSTR(class_name.as_ptr()),
                PCWSTR(title.as_ptr()),
                WS_OVERLAPPEDWINDOW,
                0,
                0,
                100,
                100,
                None,
                None,
                hinstance,
                None,
            )?;

            if hwnd.0.is_null() {
                return Err(anyhow::anyhow!("Failed to create overlay window"));
            }

            Ok(hwnd)
        }
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

    /// Show without stealing foreground focus; the first-activation
    /// workaround in the controller handles the rest.
    pub fn show(&self) {
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_SHOWNOACTIVATE);
        }
    }

    /// Called from the Tick observer with the freshly-formatted display.
    pub fn update_display(&self, title: &str, time: &str) {
        {
            let mut state = self.state.write();
            if state.title_text == title && state.time_text == time {
                return;
            }
            state.title_text = title.to_string();
            state.time_text = time.to_string();
        }
        self.invalidate();
    }

    fn invalidate(&self) {
        unsafe {
            let _ = InvalidateRect(self.hwnd, None, false);
        }
    }
}

impl MainWindow for OverlayWindow {
    fn configure_for_interactive_mode(&self) {
        self.state.write().hint_text = None;
        native::set_borderless(self.hwnd, false);
        native::set_no_activate(self.hwnd, false);
        native::set_click_through(self.hwnd, false);
        native::set_corner_preference(self.hwnd, native::CornerPreference::Default);
        native::recalc_frame(self.hwnd);
        native::bring_to_front(self.hwnd);
    }

    fn configure_for_background_mode(&self) {
        self.state.write().hint_text = None;
        native::set_no_activate(self.hwnd, true);
        native::set_borderless(self.hwnd, true);
        let radius = self.state.read().appearance.border_radius;
        native::set_corner_preference(
            self.hwnd,
            if radius > 0 {
                native::CornerPreference::Round
            } else {
                native::CornerPreference::DoNotRound
            },
        );
        native::send_to_back(self.hwnd);
        native::recalc_frame(self.hwnd);
    }

    fn set_window_bounds(&self, bounds: WindowBounds) {
        unsafe {
            let _ = SetWindowPos(
                self.hwnd,
                HWND::default(),
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height,
                SWP_NOZORDER | SWP_NOACTIVATE,
            );
        }
    }

    fn set_window_appearance(&self, appearance: &AppearanceSettings, opacity: u8) {
        self.state.write().appearance = appearance.clone();
        native::set_window_alpha(self.hwnd, opacity);
        self.invalidate();
    }

    fn show_nag_overlay(&self, text: &str) {
        self.state.write().nag_text = Some(text.to_string());
        self.invalidate();
    }

    fn change_nag_text(&self, text: &str) {
        self.state.write().nag_text = Some(text.to_string());
        self.invalidate();
    }

    fn hide_nag_overlay(&self) {
        self.state.write().nag_text = None;
        self.invalidate();
    }

    fn first_run_scaled_dimensions(&self, width: i32, height: i32) -> (i32, i32) {
        native::dpi_scaled_size(self.hwnd, width, height)
    }

    fn frame_adjustment(&self) -> FrameAdjustment {
        if let Some(adjustment) = self.frame_adjustment.get() {
            return adjustment;
        }
        let adjustment = native::measure_frame_adjustment();
        self.frame_adjustment.set(Some(adjustment));
        adjustment
    }

    fn display_interactive_hints(&self) {
        self.state.write().hint_text = Some(HINT_TEXT.to_string());
        self.invalidate();
    }

    fn shutdown(&self) {
        unsafe {
            let _ = DestroyWindow(self.hwnd);
        }
    }
}

/// Pump OS messages, draining the controller's UI queue between messages.
/// Returns when the window is destroyed or the controller requests exit.
pub fn run_message_loop(controller: &mut crate::controller::ApplicationController) -> Result<()> {
    use windows::Win32::UI::WindowsAndMessaging::{DispatchMessageW, GetMessageW, TranslateMessage, MSG};

    unsafe {
        let mut msg = MSG::default();
        loop {
            controller.process_pending_messages();
            if controller.should_exit() {
                break;
            }

            if !GetMessageW(&mut msg, None, 0, 0).as_bool() {
                break;
            }
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
        controller.process_pending_messages();
    }
    Ok(())
}

fn colorref(color: Color) -> windows::Win32::Foundation::COLORREF {
    windows::Win32::Foundation::COLORREF(
        color.r as u32 | (color.g as u32) << 8 | (color.b as u32) << 16,
    )
}

unsafe fn create_font(font: &FontDefinition, dpi: u32) -> windows::Win32::Graphics::Gdi::HFONT {
    let face = to_wide(&font.family);
    let height = -((font.size * dpi as f32 / 72.0) as i32);
    let weight = match font.weight {
        FontWeight::Normal => 400,
        FontWeight::Medium => 500,
        FontWeight::Bold => 700,
    };

    CreateFontW(
        height,
        0,
        0,
        0,
        weight,
        u32::from(font.italic),
        0,
        0,
        DEFAULT_CHARSET,
        OUT_DEFAULT_PRECIS,
        CLIP_DEFAULT_PRECIS,
        CLEARTYPE_QUALITY,
        FF_DONTCARE,
        PCWSTR(face.as_ptr()),
    )
}

unsafe fn draw_line(hdc: HDC, text: &str, font: &FontDefinition, color: Color, rect: &mut RECT, dpi: u32) {
    if text.is_empty() {
        return;
    }
    let hfont = create_font(font, dpi);
    let old_font = SelectObject(hdc, hfont);
    SetTextColor(hdc, colorref(color));
    SetBkMode(hdc, TRANSPARENT);

    let mut wide: Vec<u16> = text.encode_utf16().collect();
    DrawTextW(hdc, &mut wide, rect, DT_CENTER | DT_SINGLELINE | DT_VCENTER);

    SelectObject(hdc, old_font);
    let _ = DeleteObject(hfont);
}

unsafe fn paint_overlay(hwnd: HWND) {
    let Some(state) = get_overlay_state() else {
        return;
    };
    let state = state.read();

    let mut ps = PAINTSTRUCT::default();
    let hdc = BeginPaint(hwnd, &mut ps);
    if hdc.is_invalid() {
        return;
    }

    // Black fill is what the blur-behind region keys on; the visible
    // backdrop color is painted on top at its configured alpha-free value.
    FillRect(hdc, &ps.rcPaint, HBRUSH(GetStockObject(BLACK_BRUSH).0));
    let backdrop = CreateSolidBrush(colorref(state.appearance.background_color));
    FillRect(hdc, &ps.rcPaint, backdrop);
    let _ = DeleteObject(backdrop);

    let dpi = GetDpiForWindow(hwnd);
    let full = ps.rcPaint;
    let height = full.bottom - full.top;

    let mut title_rect = RECT {
        bottom: full.top + height / 3,
        ..full
    };
    draw_line(
        hdc,
        &state.title_text,
        &state.appearance.title_font,
        state.appearance.foreground_color,
        &mut title_rect,
        dpi,
    );

    let mut time_rect = RECT {
        top: full.top + height / 3,
        ..full
    };
    draw_line(
        hdc,
        &state.time_text,
        &state.appearance.timer_font,
        state.appearance.foreground_color,
        &mut time_rect,
        dpi,
    );

    let footer = state.nag_text.as_deref().or(state.hint_text.as_deref());
    if let Some(footer) = footer {
        let mut footer_rect = RECT {
            top: full.bottom - height / 5,
            ..full
        };
        draw_line(
            hdc,
            footer,
            &FontDefinition::new(&state.appearance.title_font.family, 12.0),
            state.appearance.border_color,
            &mut footer_rect,
            dpi,
        );
    }

    let _ = EndPaint(hwnd, &ps);
}

/// Window procedure. Effects that touch controller state are posted to the
/// UI queue; only painting happens here.
unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_CREATE => {
            debug!("Overlay window created");
            LRESULT(0)
        }

        WM_PAINT => {
            paint_overlay(hwnd);
            LRESULT(0)
        }

        WM_ERASEBKGND => LRESULT(1),

        WM_WINDOWPOSCHANGED => {
            if let Some(state) = get_overlay_state() {
                let mut rect = RECT::default();
                if GetWindowRect(hwnd, &mut rect).is_ok() {
                    state.read().dispatcher.post(UiMessage::WindowBoundsChanged(
                        WindowBounds::new(
                            rect.left,
                            rect.top,
                            rect.right - rect.left,
                            rect.bottom - rect.top,
                        ),
                    ));
                }
            }
            DefWindowProcW(hwnd, msg, wparam, lparam)
        }

        WM_ACTIVATE => {
            // Low word is WA_INACTIVE (0) when focus is leaving.
            if (wparam.0 & 0xFFFF) != 0 {
                if let Some(state) = get_overlay_state() {
                    let mut guard = state.write();
                    if !guard.activated {
                        guard.activated = true;
                        guard.dispatcher.post(UiMessage::WindowActivated);
                    }
                }
            }
            LRESULT(0)
        }

        WM_LBUTTONDBLCLK => {
            if let Some(state) = get_overlay_state() {
                state.read().dispatcher.post(UiMessage::ToggleInteractive);
            }
            LRESULT(0)
        }

        WM_CLOSE => {
            if let Some(state) = get_overlay_state() {
                state.read().dispatcher.post(UiMessage::ExitRequested);
            }
            LRESULT(0)
        }

        WM_DESTROY => {
            PostQuitMessage(0);
            LRESULT(0)
        }

        WM_LIFETIMER_WAKE => LRESULT(0),

        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
