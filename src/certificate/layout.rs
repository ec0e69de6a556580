//! Page geometry for a certificate.
//!
//! Each block turns a frame rectangle into drawing primitives and knows its
//! own height. [`compose_page`] stacks the blocks top to bottom and pins the
//! signature block to the bottom of the content area, between the optional
//! header and footer banners. Nothing here talks to the PDF encoder; units
//! are millimetres with the origin at the top-left corner of the page.

use super::raster::RasterImage;

pub const A4: PageSize = PageSize {
    width: 210.0,
    height: 297.0,
};

const OUTER_BORDER_INSET: f64 = 10.0;
const INNER_BORDER_INSET: f64 = 12.5;
const CONTENT_INSET: f64 = 20.0;
const BLOCK_GAP: f64 = 6.0;
const BANNER_GAP: f64 = 5.0;
const BANNER_INSET: f64 = 3.0;

pub const HEADER_BAND_HEIGHT: f64 = 35.0;
/// 80pt
pub const FOOTER_BAND_HEIGHT: f64 = 28.2;

/// Width the centered header and body text is fitted into.
pub const TEXT_WIDTH: f64 = 150.0;
pub const IMAGE_BOX_WIDTH: f64 = 80.0;
pub const IMAGE_BOX_HEIGHT: f64 = 60.0;
pub const QR_SIZE: f64 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn inset(&self, by: f64) -> Self {
        Self::new(
            self.x + by,
            self.y + by,
            self.width - 2.0 * by,
            self.height - 2.0 * by,
        )
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// A `width` x `height` rectangle horizontally centered in `self`, starting at `top`.
    pub fn centered(&self, top: f64, width: f64, height: f64) -> Self {
        Self::new(self.center_x() - width / 2.0, top, width, height)
    }

    #[cfg(test)]
    fn contains(&self, other: &Rect) -> bool {
        const EPS: f64 = 1e-9;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.x + other.width <= self.x + self.width + EPS
            && other.bottom() <= self.bottom() + EPS
    }
}

/// Color role of a primitive; the backend maps it to a concrete color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Heading,
    Ink,
    Emphasis,
    Muted,
    Alert,
}

/// One line of horizontally centered text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub center_x: f64,
    pub top: f64,
    /// The backend shrinks the font until the line fits this width.
    pub max_width: f64,
    pub size: u8,
    pub bold: bool,
    pub tone: Tone,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Text(TextRun),
    Line {
        from: (f64, f64),
        to: (f64, f64),
    },
    Frame {
        rect: Rect,
    },
    /// A raster fitted to `rect`. If the encoder cannot embed it, it draws a
    /// placeholder labelled `fallback` in `slot` instead.
    Image {
        raster: RasterImage,
        rect: Rect,
        slot: Rect,
        fallback: String,
    },
}

/// Every primitive of one page, in drawing order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub size: PageSize,
    pub primitives: Vec<Primitive>,
}

impl PageLayout {
    pub fn texts(&self) -> impl Iterator<Item = &TextRun> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Text(run) => Some(run),
            _ => None,
        })
    }

    pub fn has_text(&self, text: &str) -> bool {
        self.texts().any(|run| run.text == text)
    }

    pub fn image_count(&self) -> usize {
        self.primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Image { .. }))
            .count()
    }
}

pub trait Block {
    fn height(&self) -> f64;
    fn layout(&self, frame: Rect) -> Vec<Primitive>;
}

fn text(
    frame: &Rect,
    top: f64,
    text: impl Into<String>,
    size: u8,
    bold: bool,
    tone: Tone,
) -> Primitive {
    Primitive::Text(TextRun {
        text: text.into(),
        center_x: frame.center_x(),
        top,
        max_width: TEXT_WIDTH.min(frame.width),
        size,
        bold,
        tone,
    })
}

/// Bordered empty box with a centered message.
pub fn placeholder(slot: Rect, message: &str) -> Vec<Primitive> {
    vec![
        Primitive::Frame { rect: slot },
        Primitive::Text(TextRun {
            text: message.to_string(),
            center_x: slot.center_x(),
            top: slot.y + slot.height / 2.0 - 2.0,
            max_width: slot.width - 4.0,
            size: 10,
            bold: false,
            tone: Tone::Alert,
        }),
    ]
}

/// Largest rectangle with the image's aspect ratio that fits in `bounds`,
/// centered in it. `None` for degenerate dimensions.
pub fn fit_within(width: u32, height: u32, bounds: Rect) -> Option<Rect> {
    if width == 0 || height == 0 || bounds.width <= 0.0 || bounds.height <= 0.0 {
        return None;
    }
    let scale = (bounds.width / f64::from(width)).min(bounds.height / f64::from(height));
    let (w, h) = (f64::from(width) * scale, f64::from(height) * scale);
    Some(Rect::new(
        bounds.x + (bounds.width - w) / 2.0,
        bounds.y + (bounds.height - h) / 2.0,
        w,
        h,
    ))
}

pub fn border(page: PageSize) -> Vec<Primitive> {
    let sheet = Rect::new(0.0, 0.0, page.width, page.height);
    vec![
        Primitive::Frame {
            rect: sheet.inset(OUTER_BORDER_INSET),
        },
        Primitive::Frame {
            rect: sheet.inset(INNER_BORDER_INSET),
        },
    ]
}

pub struct HeaderBlock<'a> {
    pub brand: &'a str,
    pub title: &'a str,
    pub subtitle: String,
}

impl Block for HeaderBlock<'_> {
    fn height(&self) -> f64 {
        30.0
    }

    fn layout(&self, frame: Rect) -> Vec<Primitive> {
        vec![
            text(&frame, frame.y, self.brand, 12, true, Tone::Muted),
            text(&frame, frame.y + 8.0, self.title, 24, true, Tone::Heading),
            text(&frame, frame.y + 22.0, self.subtitle.clone(), 10, false, Tone::Muted),
        ]
    }
}

/// A single body line and the vertical space it takes.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyLine {
    pub text: String,
    pub size: u8,
    pub bold: bool,
    pub tone: Tone,
    pub advance: f64,
}

impl BodyLine {
    pub fn new(text: impl Into<String>, size: u8) -> Self {
        Self {
            text: text.into(),
            size,
            bold: false,
            tone: Tone::Ink,
            advance: f64::from(size) * 0.5 + 1.0,
        }
    }

    pub fn emphasized(mut self) -> Self {
        self.bold = true;
        self.tone = Tone::Emphasis;
        self.advance += 2.0;
        self
    }

    pub fn muted(mut self) -> Self {
        self.tone = Tone::Muted;
        self
    }
}

pub struct BodyBlock {
    pub lines: Vec<BodyLine>,
}

impl Block for BodyBlock {
    fn height(&self) -> f64 {
        self.lines.iter().map(|l| l.advance).sum()
    }

    fn layout(&self, frame: Rect) -> Vec<Primitive> {
        let mut top = frame.y;
        self.lines
            .iter()
            .map(|line| {
                let prim = text(&frame, top, line.text.clone(), line.size, line.bold, line.tone);
                top += line.advance;
                prim
            })
            .collect()
    }
}

pub struct ImageBlock<'a> {
    pub image: Option<&'a RasterImage>,
    pub unavailable: &'a str,
}

impl Block for ImageBlock<'_> {
    fn height(&self) -> f64 {
        IMAGE_BOX_HEIGHT
    }

    fn layout(&self, frame: Rect) -> Vec<Primitive> {
        let slot = frame.centered(frame.y, IMAGE_BOX_WIDTH, IMAGE_BOX_HEIGHT);
        match self
            .image
            .and_then(|img| fit_within(img.width, img.height, slot).map(|rect| (img, rect)))
        {
            Some((img, rect)) => vec![Primitive::Image {
                raster: img.clone(),
                rect,
                slot,
                fallback: self.unavailable.to_string(),
            }],
            None => placeholder(slot, self.unavailable),
        }
    }
}

pub struct QrBlock<'a> {
    pub qr: Option<&'a RasterImage>,
    pub url: &'a str,
    pub unavailable: &'a str,
}

impl Block for QrBlock<'_> {
    fn height(&self) -> f64 {
        QR_SIZE + 7.0
    }

    fn layout(&self, frame: Rect) -> Vec<Primitive> {
        let slot = frame.centered(frame.y, QR_SIZE, QR_SIZE);
        let mut out = match self.qr {
            Some(qr) => vec![Primitive::Image {
                raster: qr.clone(),
                rect: slot,
                slot,
                fallback: self.unavailable.to_string(),
            }],
            None => placeholder(slot, self.unavailable),
        };
        out.push(text(&frame, slot.bottom() + 2.0, self.url, 8, false, Tone::Muted));
        out
    }
}

/// An optional page asset (signature, header or footer artwork).
#[derive(Debug, Clone, PartialEq)]
pub enum AssetSlot {
    /// Not configured; nothing is drawn and no space is taken.
    Absent,
    Ready(RasterImage),
    Unavailable,
}

pub struct SignatureBlock<'a> {
    pub captions: [&'a str; 2],
    pub signature: &'a AssetSlot,
    pub unavailable: &'a str,
}

impl SignatureBlock<'_> {
    const LINE_WIDTH: f64 = 60.0;
    const SIGNATURE_HEIGHT: f64 = 15.0;
}

impl Block for SignatureBlock<'_> {
    fn height(&self) -> f64 {
        Self::SIGNATURE_HEIGHT + 12.0
    }

    fn layout(&self, frame: Rect) -> Vec<Primitive> {
        let line_y = frame.y + Self::SIGNATURE_HEIGHT + 2.0;
        let columns = [
            frame.x + frame.width * 0.25,
            frame.x + frame.width * 0.75,
        ];
        let mut out = Vec::new();

        for (center, caption) in columns.iter().zip(self.captions) {
            out.push(Primitive::Line {
                from: (center - Self::LINE_WIDTH / 2.0, line_y),
                to: (center + Self::LINE_WIDTH / 2.0, line_y),
            });
            out.push(Primitive::Text(TextRun {
                text: caption.to_string(),
                center_x: *center,
                top: line_y + 2.0,
                max_width: Self::LINE_WIDTH,
                size: 10,
                bold: false,
                tone: Tone::Ink,
            }));
        }

        let slot = Rect::new(
            columns[0] - Self::LINE_WIDTH / 2.0,
            frame.y,
            Self::LINE_WIDTH,
            Self::SIGNATURE_HEIGHT,
        );
        match self.signature {
            AssetSlot::Absent => {}
            AssetSlot::Ready(img) => match fit_within(img.width, img.height, slot) {
                Some(rect) => out.push(Primitive::Image {
                    raster: img.clone(),
                    rect,
                    slot,
                    fallback: self.unavailable.to_string(),
                }),
                None => out.push(unavailable_signature(slot, self.unavailable)),
            },
            AssetSlot::Unavailable => out.push(unavailable_signature(slot, self.unavailable)),
        }
        out
    }
}

fn unavailable_signature(slot: Rect, label: &str) -> Primitive {
    Primitive::Text(TextRun {
        text: label.to_string(),
        center_x: slot.center_x(),
        top: slot.bottom() - 5.0,
        max_width: slot.width,
        size: 9,
        bold: false,
        tone: Tone::Alert,
    })
}

/// Which edge of the page a banner is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Top,
    Bottom,
}

/// Full-width header or footer artwork.
pub struct BannerBlock<'a> {
    pub asset: &'a AssetSlot,
    pub edge: Edge,
    pub unavailable: &'a str,
}

impl Block for BannerBlock<'_> {
    fn height(&self) -> f64 {
        match (self.asset, self.edge) {
            (AssetSlot::Absent, _) => 0.0,
            (_, Edge::Top) => HEADER_BAND_HEIGHT,
            (_, Edge::Bottom) => FOOTER_BAND_HEIGHT,
        }
    }

    fn layout(&self, frame: Rect) -> Vec<Primitive> {
        match self.asset {
            AssetSlot::Absent => Vec::new(),
            AssetSlot::Ready(img) => match fit_within(img.width, img.height, frame) {
                Some(fitted) => {
                    let y = match self.edge {
                        Edge::Top => frame.y,
                        Edge::Bottom => frame.bottom() - fitted.height,
                    };
                    vec![Primitive::Image {
                        raster: img.clone(),
                        rect: Rect::new(fitted.x, y, fitted.width, fitted.height),
                        slot: frame,
                        fallback: self.unavailable.to_string(),
                    }]
                }
                None => placeholder(frame.inset(BANNER_INSET), self.unavailable),
            },
            AssetSlot::Unavailable => placeholder(frame.inset(BANNER_INSET), self.unavailable),
        }
    }
}

/// The blocks of one certificate page.
pub struct PageBlocks<'a> {
    pub top_banner: &'a dyn Block,
    pub header: &'a dyn Block,
    pub body: &'a dyn Block,
    pub image: &'a dyn Block,
    pub qr: &'a dyn Block,
    pub signature: &'a dyn Block,
    pub bottom_banner: &'a dyn Block,
}

/// Stacks the blocks on one page. Banners span the full page width at the
/// top and bottom edges and push the content area inwards.
pub fn compose_page(page: PageSize, blocks: &PageBlocks<'_>) -> PageLayout {
    let sheet = Rect::new(0.0, 0.0, page.width, page.height);
    let mut primitives = Vec::new();

    let top_height = blocks.top_banner.height();
    let bottom_height = blocks.bottom_banner.height();
    primitives.extend(
        blocks
            .top_banner
            .layout(Rect::new(0.0, 0.0, page.width, top_height)),
    );
    primitives.extend(blocks.bottom_banner.layout(Rect::new(
        0.0,
        page.height - bottom_height,
        page.width,
        bottom_height,
    )));
    primitives.extend(border(page));

    let inset = sheet.inset(CONTENT_INSET);
    let top_edge = inset.y.max(top_height + BANNER_GAP);
    let bottom_edge = inset.bottom().min(page.height - bottom_height - BANNER_GAP);
    let content = Rect::new(inset.x, top_edge, inset.width, bottom_edge - top_edge);

    let mut top = content.y;
    for block in [blocks.header, blocks.body, blocks.image, blocks.qr] {
        let frame = Rect::new(content.x, top, content.width, block.height());
        primitives.extend(block.layout(frame));
        top = frame.bottom() + BLOCK_GAP;
    }

    let height = blocks.signature.height();
    let frame = Rect::new(content.x, content.bottom() - height, content.width, height);
    primitives.extend(blocks.signature.layout(frame));

    PageLayout {
        size: page,
        primitives,
    }
}

/// Rectangles and lines that leave the page. Empty for a sound layout.
#[cfg(test)]
fn out_of_bounds(layout: &PageLayout) -> Vec<&Primitive> {
    let sheet = Rect::new(0.0, 0.0, layout.size.width, layout.size.height);
    layout
        .primitives
        .iter()
        .filter(|p| match p {
            Primitive::Frame { rect, .. } => !sheet.contains(rect),
            Primitive::Image { rect, slot, .. } => !sheet.contains(rect) || !slot.contains(rect),
            Primitive::Line { from, to, .. } => {
                let span = Rect::new(
                    from.0.min(to.0),
                    from.1.min(to.1),
                    (to.0 - from.0).abs(),
                    (to.1 - from.1).abs(),
                );
                !sheet.contains(&span)
            }
            Primitive::Text(run) => run.top < 0.0 || run.top > sheet.height,
        })
        .collect()
}
