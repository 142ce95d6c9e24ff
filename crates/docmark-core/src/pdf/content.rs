//! Minimal content-stream interpreter for positioned text
//!
//! Walks a page's decoded operator stream tracking the transformation and
//! text matrices, and emits one [`TextRun`] per shown string. Glyph
//! advances use an average-width model (half the font size per character),
//! so run boxes are approximate horizontally but exact in position and
//! baseline. Text inside Form XObjects is not traversed.

use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

/// Average glyph advance as a fraction of the font size
const AVG_GLYPH_WIDTH: f32 = 0.5;
/// Extent of glyphs above the baseline, as a fraction of the font size
const ASCENT: f32 = 0.8;
/// Extent of glyphs below the baseline, as a fraction of the font size
const DESCENT: f32 = 0.2;

/// A shown string with its device-space quad
#[derive(Debug, Clone)]
pub struct TextRun {
    pub text: String,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    /// Baseline y in device space, used for line grouping
    pub baseline: f32,
    /// Effective font size in device space
    pub size: f32,
}

/// Collect the positioned text runs of one page, in stream order
pub(crate) fn text_runs(doc: &Document, page_id: ObjectId) -> Result<Vec<TextRun>, lopdf::Error> {
    let data = doc.get_page_content(page_id)?;
    let content = Content::decode(&data)?;

    let mut runs = Vec::new();
    let mut interp = Interpreter::new();
    for op in &content.operations {
        interp.step(op.operator.as_str(), &op.operands, &mut runs);
    }
    Ok(runs)
}

/// 2D affine transform, PDF row-vector convention: p' = p × M
#[derive(Debug, Clone, Copy)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn translation(tx: f32, ty: f32) -> Matrix {
        Matrix {
            e: tx,
            f: ty,
            ..Matrix::IDENTITY
        }
    }

    /// Matrix product self × m (apply self first, then m)
    fn then(self, m: Matrix) -> Matrix {
        Matrix {
            a: self.a * m.a + self.b * m.c,
            b: self.a * m.b + self.b * m.d,
            c: self.c * m.a + self.d * m.c,
            d: self.c * m.b + self.d * m.d,
            e: self.e * m.a + self.f * m.c + m.e,
            f: self.e * m.b + self.f * m.d + m.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Vertical scale factor, for mapping font size to device space
    fn vertical_scale(&self) -> f32 {
        (self.b * self.b + self.d * self.d).sqrt()
    }
}

/// Graphics parameters saved and restored by q/Q
#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    size: f32,
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,
    hscale: f32,
    rise: f32,
}

struct Interpreter {
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    tm: Matrix,
    tlm: Matrix,
}

impl Interpreter {
    fn new() -> Self {
        Self {
            state: GraphicsState {
                ctm: Matrix::IDENTITY,
                size: 0.0,
                leading: 0.0,
                char_spacing: 0.0,
                word_spacing: 0.0,
                hscale: 1.0,
                rise: 0.0,
            },
            stack: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
        }
    }

    fn step(&mut self, operator: &str, operands: &[Object], runs: &mut Vec<TextRun>) {
        match operator {
            "q" => self.stack.push(self.state),
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operand(operands) {
                    self.state.ctm = m.then(self.state.ctm);
                }
            }
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let Some(size) = operands.get(1).and_then(number) {
                    self.state.size = size;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(number),
                    operands.get(1).and_then(number),
                ) {
                    self.next_line_offset(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(number),
                    operands.get(1).and_then(number),
                ) {
                    self.state.leading = -ty;
                    self.next_line_offset(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = matrix_operand(operands) {
                    self.tlm = m;
                    self.tm = m;
                }
            }
            "T*" => self.next_line(),
            "TL" => {
                if let Some(l) = operands.first().and_then(number) {
                    self.state.leading = l;
                }
            }
            "Tc" => {
                if let Some(v) = operands.first().and_then(number) {
                    self.state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = operands.first().and_then(number) {
                    self.state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = operands.first().and_then(number) {
                    self.state.hscale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = operands.first().and_then(number) {
                    self.state.rise = v;
                }
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes, runs);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes, runs);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (
                    operands.first().and_then(number),
                    operands.get(1).and_then(number),
                ) {
                    self.state.word_spacing = aw;
                    self.state.char_spacing = ac;
                }
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show(bytes, runs);
                }
            }
            "TJ" => {
                if let Some(Object::Array(elements)) = operands.first() {
                    for element in elements {
                        match element {
                            Object::String(bytes, _) => self.show(bytes, runs),
                            other => {
                                if let Some(adjust) = number(other) {
                                    let tx = -adjust / 1000.0
                                        * self.state.size
                                        * self.state.hscale;
                                    self.tm = Matrix::translation(tx, 0.0).then(self.tm);
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.next_line_offset(0.0, -leading);
    }

    fn next_line_offset(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translation(tx, ty).then(self.tlm);
        self.tm = self.tlm;
    }

    fn show(&mut self, bytes: &[u8], runs: &mut Vec<TextRun>) {
        let text = decode_text_bytes(bytes);
        // Tf is mandatory before show operators; tolerate its absence with
        // a nominal size
        let size = if self.state.size > 0.0 {
            self.state.size
        } else {
            12.0
        };

        let mut advance = 0.0;
        for c in text.chars() {
            advance += size * AVG_GLYPH_WIDTH + self.state.char_spacing;
            if c == ' ' {
                advance += self.state.word_spacing;
            }
        }
        let advance = advance * self.state.hscale;

        if !text.trim().is_empty() {
            let trm = self.tm.then(self.state.ctm);
            let rise = self.state.rise;
            let corners = [
                trm.apply(0.0, rise - DESCENT * size),
                trm.apply(advance, rise - DESCENT * size),
                trm.apply(0.0, rise + ASCENT * size),
                trm.apply(advance, rise + ASCENT * size),
            ];
            let x0 = corners.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
            let x1 = corners.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
            let y0 = corners.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
            let y1 = corners.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);

            runs.push(TextRun {
                text,
                x0,
                y0,
                x1,
                y1,
                baseline: trm.apply(0.0, rise).1,
                size: size * trm.vertical_scale(),
            });
        }

        self.tm = Matrix::translation(advance, 0.0).then(self.tm);
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn matrix_operand(operands: &[Object]) -> Option<Matrix> {
    let values: Vec<f32> = operands.iter().filter_map(number).collect();
    if values.len() == 6 {
        Some(Matrix {
            a: values[0],
            b: values[1],
            c: values[2],
            d: values[3],
            e: values[4],
            f: values[5],
        })
    } else {
        None
    }
}

/// Decode a shown string's bytes
///
/// UTF-16BE when BOM-prefixed, Latin-1 otherwise. CID fonts with custom
/// CMaps decode approximately; run geometry is unaffected.
pub(crate) fn decode_text_bytes(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}
