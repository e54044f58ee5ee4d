//! Screen layout from KWin's support-information dump
//!
//! The dump contains blocks like:
//!
//! ```text
//! Screen 0:
//! ---------
//! Name: DP-1
//! Geometry: 0,0,2560x1440
//! ```

/// One screen entry with the index KWin uses in its shortcut names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenInfo {
    pub index: u32,
    pub name: Option<String>,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl ScreenInfo {
    pub fn contains(&self, px: f64, py: f64) -> bool {
        let (x, y) = (self.x as f64, self.y as f64);
        x <= px && px < x + self.width as f64 && y <= py && py < y + self.height as f64
    }
}

struct PartialScreen {
    index: u32,
    name: Option<String>,
    geometry: Option<(i64, i64, i64, i64)>,
}

impl PartialScreen {
    fn finish(self) -> Option<ScreenInfo> {
        let (x, y, width, height) = self.geometry?;
        Some(ScreenInfo {
            index: self.index,
            name: self.name,
            x,
            y,
            width,
            height,
        })
    }
}

/// Parse every screen block that carries a geometry
pub fn parse_support_information(text: &str) -> Vec<ScreenInfo> {
    let mut screens = Vec::new();
    let mut current: Option<PartialScreen> = None;

    for raw in text.lines() {
        let line = raw.trim();

        if let Some(index) = parse_screen_header(line) {
            if let Some(screen) = current.take().and_then(PartialScreen::finish) {
                screens.push(screen);
            }
            current = Some(PartialScreen {
                index,
                name: None,
                geometry: None,
            });
            continue;
        }

        let Some(screen) = current.as_mut() else {
            continue;
        };
        if let Some(name) = line.strip_prefix("Name:") {
            screen.name = Some(name.trim().to_string());
        } else if let Some(geometry) = line.strip_prefix("Geometry:") {
            if let Some(parsed) = parse_geometry(geometry.trim()) {
                screen.geometry = Some(parsed);
            }
        }
    }

    if let Some(screen) = current.and_then(PartialScreen::finish) {
        screens.push(screen);
    }
    screens
}

/// Index of the first screen containing the point
pub fn screen_at(screens: &[ScreenInfo], px: f64, py: f64) -> Option<u32> {
    screens.iter().find(|s| s.contains(px, py)).map(|s| s.index)
}

/// `Screen <n>:` at the start of a line
fn parse_screen_header(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("Screen ")?;
    let (digits, _) = rest.split_once(':')?;
    digits.parse().ok()
}

/// `x,y,WxH`
fn parse_geometry(text: &str) -> Option<(i64, i64, i64, i64)> {
    let mut parts = text.splitn(3, ',');
    let x = parts.next()?.trim().parse().ok()?;
    let y = parts.next()?.trim().parse().ok()?;
    let size = parts.next()?.trim();
    let (w, h) = size.split_once('x')?;
    let w = w.trim().parse().ok()?;
    let h: String = h.chars().take_while(|c| c.is_ascii_digit()).collect();
    Some((x, y, w, h.parse().ok()?))
}
