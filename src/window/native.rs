//! Native window styling operations
//!
//! Declarative wrappers over the Win32 style bits the overlay window flips
//! when switching between interactive and background mode. Every operation
//! read-modify-writes the existing style so unrelated bits survive, and is
//! safe to apply redundantly. Environment failures are logged and degrade;
//! they never propagate into the mode state machine.

#![allow(dead_code)]

use log::{debug, warn};
use windows::Win32::Foundation::{COLORREF, HWND, RECT};
use windows::Win32::Graphics::Dwm::{
    DwmEnableBlurBehindWindow, DwmExtendFrameIntoClientArea, DwmSetWindowAttribute,
    DWMWA_WINDOW_CORNER_PREFERENCE, DWM_BB_BLURREGION, DWM_BB_ENABLE, DWM_BLURBEHIND,
    DWM_WINDOW_CORNER_PREFERENCE, DWMWCP_DEFAULT, DWMWCP_DONOTROUND, DWMWCP_ROUND,
    DWMWCP_ROUNDSMALL,
};
use windows::Win32::Graphics::Gdi::{
    CreateRectRgn, DeleteObject, MonitorFromWindow, MONITOR_DEFAULTTONEAREST,
};
use windows::Win32::UI::Controls::MARGINS;
use windows::Win32::UI::HiDpi::{GetDpiForMonitor, MDT_EFFECTIVE_DPI};
use windows::Win32::UI::WindowsAndMessaging::{
    AdjustWindowRectEx, GetWindowLongPtrW, SetForegroundWindow, SetLayeredWindowAttributes,
    SetWindowLongPtrW, SetWindowPos, GWL_EXSTYLE, GWL_STYLE, HWND_BOTTOM, LWA_ALPHA,
    SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER, WS_CAPTION,
    WS_EX_CLIENTEDGE, WS_EX_DLGMODALFRAME, WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_STATICEDGE,
    WS_EX_TRANSPARENT, WS_EX_WINDOWEDGE, WS_MAXIMIZEBOX, WS_MINIMIZEBOX, WS_OVERLAPPEDWINDOW,
    WS_THICKFRAME,
};

use crate::bounds::FrameAdjustment;

/// Window corner preference (Windows 11).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CornerPreference {
    Default,
    DoNotRound,
    Round,
    RoundSmall,
}

impl From<CornerPreference> for DWM_WINDOW_CORNER_PREFERENCE {
    fn from(pref: CornerPreference) -> Self {
        match pref {
            CornerPreference::Default => DWMWCP_DEFAULT,
            CornerPreference::DoNotRound => DWMWCP_DONOTROUND,
            CornerPreference::Round => DWMWCP_ROUND,
            CornerPreference::RoundSmall => DWMWCP_ROUNDSMALL,
        }
    }
}

fn get_style(hwnd: HWND) -> isize {
    unsafe { GetWindowLongPtrW(hwnd, GWL_STYLE) }
}

fn set_style(hwnd: HWND, style: isize) {
    unsafe {
        SetWindowLongPtrW(hwnd, GWL_STYLE, style);
    }
}

fn get_ex_style(hwnd: HWND) -> isize {
    unsafe { GetWindowLongPtrW(hwnd, GWL_EXSTYLE) }
}

fn set_ex_style(hwnd: HWND, ex_style: isize) {
    unsafe {
        SetWindowLongPtrW(hwnd, GWL_EXSTYLE, ex_style);
    }
}

/// Strip or restore the window chrome. `true` removes caption and sizing
/// frame and extends the DWM frame into the client area (sheet-of-glass);
/// `false` restores the framed interactive style without min/max boxes.
pub fn set_borderless(hwnd: HWND, borderless: bool) {
    if borderless {
        let style = get_style(hwnd) & !((WS_CAPTION.0 | WS_THICKFRAME.0) as isize);
        set_style(hwnd, style);

        let mut ex_style = get_ex_style(hwnd);
        ex_style &= !((WS_EX_DLGMODALFRAME.0 | WS_EX_CLIENTEDGE.0 | WS_EX_STATICEDGE.0) as isize);
        ex_style |= WS_EX_LAYERED.0 as isize;
        set_ex_style(hwnd, ex_style);

        let margins = MARGINS {
            cxLeftWidth: -1,
            cxRightWidth: -1,
            cyTopHeight: -1,
            cyBottomHeight: -1,
        };
        if let Err(e) = unsafe { DwmExtendFrameIntoClientArea(hwnd, &margins) } {
            warn!("DwmExtendFrameIntoClientArea failed: {}", e);
        }
    } else {
        let mut style = get_style(hwnd);
        style |= (WS_CAPTION.0 | WS_THICKFRAME.0) as isize;
        style &= !((WS_MAXIMIZEBOX.0 | WS_MINIMIZEBOX.0) as isize);
        set_style(hwnd, style);

        let ex_style = get_ex_style(hwnd)
            | (WS_EX_DLGMODALFRAME.0 | WS_EX_CLIENTEDGE.0 | WS_EX_STATICEDGE.0) as isize;
        set_ex_style(hwnd, ex_style);

        let margins = MARGINS::default();
        if let Err(e) = unsafe { DwmExtendFrameIntoClientArea(hwnd, &margins) } {
            warn!("DwmExtendFrameIntoClientArea failed: {}", e);
        }
    }
}

/// Let mouse input pass through the window to whatever is underneath.
pub fn set_click_through(hwnd: HWND, click_through: bool) {
    let mut ex_style = get_ex_style(hwnd);
    if click_through {
        ex_style |= (WS_EX_TRANSPARENT.0 | WS_EX_LAYERED.0) as isize;
    } else {
        ex_style &= !(WS_EX_TRANSPARENT.0 as isize);
    }
    set_ex_style(hwnd, ex_style);
}

/// Keep the window from taking foreground focus when clicked or shown.
pub fn set_no_activate(hwnd: HWND, no_activate: bool) {
    let mut ex_style = get_ex_style(hwnd);
    if no_activate {
        ex_style |= WS_EX_NOACTIVATE.0 as isize;
    } else {
        ex_style &= !(WS_EX_NOACTIVATE.0 as isize);
    }
    set_ex_style(hwnd, ex_style);
}

/// Push the window to the bottom of the z-order without activating it.
pub fn send_to_back(hwnd: HWND) {
    unsafe {
        if let Err(e) = SetWindowPos(
            hwnd,
            HWND_BOTTOM,
            0,
            0,
            0,
            0,
            SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE | SWP_FRAMECHANGED,
        ) {
            warn!("SetWindowPos(HWND_BOTTOM) failed: {}", e);
        }
    }
}

pub fn bring_to_front(hwnd: HWND) {
    unsafe {
        let _ = SetForegroundWindow(hwnd);
    }
}

/// Force the OS to re-evaluate the frame after style changes.
pub fn recalc_frame(hwnd: HWND) {
    unsafe {
        if let Err(e) = SetWindowPos(
            hwnd,
            HWND::default(),
            0,
            0,
            0,
            0,
            SWP_FRAMECHANGED | SWP_NOZORDER | SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
        ) {
            warn!("SetWindowPos(SWP_FRAMECHANGED) failed: {}", e);
        }
    }
}

/// Whole-window alpha for the layered overlay.
pub fn set_window_alpha(hwnd: HWND, alpha: u8) {
    let ex_style = get_ex_style(hwnd) | WS_EX_LAYERED.0 as isize;
    set_ex_style(hwnd, ex_style);
    unsafe {
        if let Err(e) = SetLayeredWindowAttributes(hwnd, COLORREF(0), alpha.max(1), LWA_ALPHA) {
            warn!("SetLayeredWindowAttributes failed: {}", e);
        }
    }
}

pub fn set_corner_preference(hwnd: HWND, preference: CornerPreference) {
    let value: DWM_WINDOW_CORNER_PREFERENCE = preference.into();
    unsafe {
        let result = DwmSetWindowAttribute(
            hwnd,
            DWMWA_WINDOW_CORNER_PREFERENCE,
            &value as *const _ as *const _,
            std::mem::size_of::<DWM_WINDOW_CORNER_PREFERENCE>() as u32,
        );
        if result.is_ok() {
            debug!("Applied corner preference {:?}", preference);
        }
    }
}

/// Blur-behind with an off-screen region. Together with painting the client
/// area black, this is what makes the overlay's background translucent while
/// its text stays opaque.
pub fn enable_blur_behind(hwnd: HWND) {
    unsafe {
        let region = CreateRectRgn(-2, -2, -1, -1);
        let blur = DWM_BLURBEHIND {
            dwFlags: DWM_BB_ENABLE | DWM_BB_BLURREGION,
            fEnable: true.into(),
            hRgnBlur: region,
            fTransitionOnMaximized: false.into(),
        };
        if let Err(e) = DwmEnableBlurBehindWindow(hwnd, &blur) {
            warn!("DwmEnableBlurBehindWindow failed: {}", e);
        }
        let _ = DeleteObject(region);
    }
}

/// Physical pixel size for a logical size on the monitor nearest the window.
/// DPI query failures fall back to unscaled dimensions.
pub fn dpi_scaled_size(hwnd: HWND, logical_width: i32, logical_height: i32) -> (i32, i32) {
    let monitor = unsafe { MonitorFromWindow(hwnd, MONITOR_DEFAULTTONEAREST) };

    let mut dpi_x = 0u32;
    let mut dpi_y = 0u32;
    if let Err(e) = unsafe { GetDpiForMonitor(monitor, MDT_EFFECTIVE_DPI, &mut dpi_x, &mut dpi_y) } {
        warn!("GetDpiForMonitor failed, using unscaled size: {}", e);
        return (logical_width, logical_height);
    }

    let scale = dpi_x as f64 / 96.0;
    (
        (logical_width as f64 * scale) as i32,
        (logical_height as f64 * scale) as i32,
    )
}

/// Ask the OS what window rectangle would contain a zero-sized client
/// rectangle under the framed style. The resulting deltas feed the
/// controller's mode-transition bounds arithmetic.
pub fn measure_frame_adjustment() -> FrameAdjustment {
    let mut rect = RECT::default();
    let ex_style = WS_EX_WINDOWEDGE | WS_EX_CLIENTEDGE;

    if let Err(e) = unsafe { AdjustWindowRectEx(&mut rect, WS_OVERLAPPEDWINDOW, false, ex_style) } {
        warn!("AdjustWindowRectEx failed, assuming zero frame: {}", e);
        return FrameAdjustment::default();
    }

    FrameAdjustment::new(rect.left, rect.top, rect.right, rect.bottom)
}
