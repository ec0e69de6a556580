// Certificate PDF encoding
// Uses genpdf - needs a TrueType family: the bundled assets/fonts, Liberation or DejaVu
use genpdf::elements::Image;
use genpdf::fonts::{FontData, FontFamily};
use genpdf::render::Area;
use genpdf::style::{Color, Style};
use genpdf::{Context, Element, Mm, Position, RenderResult, Scale, Size};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::certificate::layout::{placeholder, PageLayout, Primitive, Rect, TextRun, Tone, A4};
use crate::certificate::raster::RasterImage;
use crate::certificate::CertificateDocument;

const IMAGE_DPI: f64 = 300.0;
const MIN_FONT_SIZE: u8 = 6;

const FONT_DIRS: [&str; 7] = [
    "assets/fonts",
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/TTF",
    "/usr/share/fonts/liberation-sans",
    "/System/Library/Fonts/Supplemental",
    "/Library/Fonts",
];
const FONT_NAMES: [&str; 3] = ["LiberationSans", "DejaVuSans", "Arial"];

// File name suffixes per style. Liberation ships `-Regular`/`-Italic`,
// DejaVu ships a bare regular file and `-Oblique`.
const REGULAR: [&str; 2] = ["-Regular", ""];
const BOLD: [&str; 1] = ["-Bold"];
const ITALIC: [&str; 2] = ["-Italic", "-Oblique"];
const BOLD_ITALIC: [&str; 2] = ["-BoldItalic", "-BoldOblique"];

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("No suitable fonts found. Install: apt install fonts-liberation")]
    NoFonts,

    #[error("no regular {family} font in {dir}")]
    MissingFont { dir: String, family: String },

    #[error("failed to load font {path}: {source}")]
    Font {
        path: String,
        source: genpdf::error::Error,
    },

    #[error("PDF rendering failed: {0}")]
    Render(#[from] genpdf::error::Error),
}

fn font_file(dir: &Path, name: &str, suffixes: &[&str]) -> Option<PathBuf> {
    suffixes
        .iter()
        .map(|suffix| dir.join(format!("{}{}.ttf", name, suffix)))
        .find(|path| path.is_file())
}

fn load_style(dir: &Path, name: &str, suffixes: &[&str]) -> Result<Option<FontData>, PdfError> {
    match font_file(dir, name, suffixes) {
        Some(path) => FontData::load(&path, None)
            .map(Some)
            .map_err(|source| PdfError::Font {
                path: path.display().to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Loads `name` from `dir`. Only the regular face is required; missing bold
/// and italic faces reuse the closest face that exists.
pub fn load_family(dir: &Path, name: &str) -> Result<FontFamily<FontData>, PdfError> {
    let regular = load_style(dir, name, &REGULAR)?.ok_or_else(|| PdfError::MissingFont {
        dir: dir.display().to_string(),
        family: name.to_string(),
    })?;
    let bold = load_style(dir, name, &BOLD)?.unwrap_or_else(|| regular.clone());
    let italic = load_style(dir, name, &ITALIC)?.unwrap_or_else(|| regular.clone());
    let bold_italic = load_style(dir, name, &BOLD_ITALIC)?.unwrap_or_else(|| bold.clone());

    Ok(FontFamily {
        regular,
        bold,
        italic,
        bold_italic,
    })
}

/// Loads the font family genpdf measures and embeds text with. An explicit
/// directory/family must load; otherwise common locations are tried.
pub fn load_fonts(dir: Option<&Path>, family: Option<&str>) -> Result<FontFamily<FontData>, PdfError> {
    let names: Vec<&str> = match family {
        Some(name) => vec![name],
        None => FONT_NAMES.to_vec(),
    };

    if let Some(dir) = dir {
        let mut last = PdfError::NoFonts;
        for name in &names {
            match load_family(dir, name) {
                Ok(fonts) => return Ok(fonts),
                Err(e) => last = e,
            }
        }
        return Err(last);
    }

    FONT_DIRS
        .iter()
        .map(Path::new)
        .filter(|p| p.is_dir())
        .find_map(|path| {
            names
                .iter()
                .find_map(|name| load_family(path, name).ok())
        })
        .ok_or(PdfError::NoFonts)
}

/// Encodes the document, one PDF page per laid-out page.
pub fn render_document<W: std::io::Write>(
    document: CertificateDocument,
    fonts: FontFamily<FontData>,
    out: W,
) -> Result<(), PdfError> {
    let paper = document.pages().first().map(|p| p.size).unwrap_or(A4);

    let mut doc = genpdf::Document::new(fonts);
    doc.set_title(document.title.clone());
    doc.set_paper_size(Size::new(paper.width, paper.height));

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(0);
    doc.set_page_decorator(decorator);

    // Each page element fills its whole page, so genpdf starts a new page
    // for the next one without an explicit break.
    for page in document.into_pages() {
        doc.push(PageElement { layout: page });
    }

    doc.render(out)?;
    Ok(())
}

pub fn render_to_vec(
    document: CertificateDocument,
    fonts: FontFamily<FontData>,
) -> Result<Vec<u8>, PdfError> {
    let mut buf = Vec::new();
    render_document(document, fonts, &mut buf)?;
    Ok(buf)
}

/// Draws the primitives of one page into the full page area.
struct PageElement {
    layout: PageLayout,
}

impl Element for PageElement {
    fn render(
        &mut self,
        context: &Context,
        area: Area<'_>,
        style: Style,
    ) -> Result<RenderResult, genpdf::error::Error> {
        for primitive in &self.layout.primitives {
            draw(primitive, context, &area, style)?;
        }
        Ok(RenderResult {
            size: area.size(),
            has_more: false,
        })
    }
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Heading => Color::Rgb(0x2c, 0x3e, 0x50),
        Tone::Ink => Color::Rgb(0x34, 0x49, 0x5e),
        Tone::Emphasis => Color::Rgb(0x11, 0x18, 0x27),
        Tone::Muted => Color::Rgb(0x5c, 0x6a, 0x78),
        Tone::Alert => Color::Rgb(0xe7, 0x4c, 0x3c),
    }
}

fn pos(x: f64, y: f64) -> Position {
    Position::new(Mm::from(x), Mm::from(y))
}

fn draw(
    primitive: &Primitive,
    context: &Context,
    area: &Area<'_>,
    style: Style,
) -> Result<(), genpdf::error::Error> {
    let rule = style.with_color(tone_color(Tone::Heading));
    match primitive {
        Primitive::Text(run) => draw_text(run, context, area, style),
        Primitive::Line { from, to } => {
            area.draw_line(vec![pos(from.0, from.1), pos(to.0, to.1)], rule);
            Ok(())
        }
        Primitive::Frame { rect } => {
            area.draw_line(
                vec![
                    pos(rect.x, rect.y),
                    pos(rect.x + rect.width, rect.y),
                    pos(rect.x + rect.width, rect.bottom()),
                    pos(rect.x, rect.bottom()),
                    pos(rect.x, rect.y),
                ],
                rule,
            );
            Ok(())
        }
        Primitive::Image {
            raster,
            rect,
            slot,
            fallback,
        } => {
            if let Err(e) = draw_image(raster, rect, context, area, style) {
                warn!("Image could not be embedded, drawing placeholder: {}", e);
                for p in placeholder(*slot, fallback) {
                    draw(&p, context, area, style)?;
                }
            }
            Ok(())
        }
    }
}

fn draw_text(
    run: &TextRun,
    context: &Context,
    area: &Area<'_>,
    style: Style,
) -> Result<(), genpdf::error::Error> {
    let mut size = run.size;
    let mut text_style = style.with_font_size(size).with_color(tone_color(run.tone));
    if run.bold {
        text_style = text_style.bold();
    }

    let max_width = Mm::from(run.max_width);
    let mut width = text_style.str_width(&context.font_cache, &run.text);
    while width > max_width && size > MIN_FONT_SIZE {
        size -= 1;
        text_style = text_style.with_font_size(size);
        width = text_style.str_width(&context.font_cache, &run.text);
    }

    let x = Mm::from(run.center_x) - width / 2.0;
    area.print_str(
        &context.font_cache,
        Position::new(x, Mm::from(run.top)),
        text_style,
        &run.text,
    )?;
    Ok(())
}

fn draw_image(
    raster: &RasterImage,
    rect: &Rect,
    context: &Context,
    area: &Area<'_>,
    style: Style,
) -> Result<(), genpdf::error::Error> {
    let natural_width = f64::from(raster.width) * 25.4 / IMAGE_DPI;
    let scale = rect.width / natural_width;

    let mut image = Image::from_reader(Cursor::new(raster.png.clone()))?
        .with_dpi(IMAGE_DPI)
        .with_scale(Scale::new(scale, scale));

    let mut target = area.clone();
    target.add_offset(pos(rect.x, rect.y));
    target.set_size(Size::new(rect.width, rect.height));
    image.render(context, target, style)?;
    Ok(())
}
