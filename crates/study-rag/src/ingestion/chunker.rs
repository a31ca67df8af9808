//! Text chunking on natural boundaries with overlap tracking

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::types::Chunk;

/// Contiguous byte range of the source text that is never split further
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    chars: usize,
}

/// Text chunker with configurable size and overlap
///
/// Pieces are sentences (UAX #29, which also breaks after every newline),
/// falling back to words and then to hard character splits for anything
/// longer than `chunk_size`. Pieces are merged greedily; each chunk after
/// the first starts with the trailing pieces of its predecessor that fit in
/// `overlap`. Lengths are counted in chars.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker; overlap is clamped below `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Create from chunking configuration
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Target chunk size in characters
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split a document's text into chunks attributed to `source`
    pub fn split(&self, source: &str, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut window: Vec<Piece> = Vec::new();
        let mut window_len = 0usize;
        let mut carried = 0usize;

        for piece in self.pieces(text) {
            if !window.is_empty() && window_len + piece.chars > self.chunk_size {
                chunks.push(self.emit(source, text, &window, carried, chunks.len()));

                let mut keep = 0usize;
                let mut kept_len = 0usize;
                for p in window.iter().rev() {
                    if kept_len + p.chars > self.overlap
                        || kept_len + p.chars + piece.chars > self.chunk_size
                    {
                        break;
                    }
                    kept_len += p.chars;
                    keep += 1;
                }

                window.drain(..window.len() - keep);
                window_len = kept_len;
                carried = keep;
            }

            window_len += piece.chars;
            window.push(piece);
        }

        if window.len() > carried {
            chunks.push(self.emit(source, text, &window, carried, chunks.len()));
        }

        chunks
    }

    fn emit(&self, source: &str, text: &str, window: &[Piece], carried: usize, sequence: usize) -> Chunk {
        let start = window[0].start;
        let end = window[window.len() - 1].end;
        let overlap = if carried > 0 {
            window[carried].start - start
        } else {
            0
        };

        Chunk::new(
            source,
            sequence as u32,
            text[start..end].to_string(),
            start,
            overlap,
        )
    }

    /// Partition `text` into bounded pieces whose concatenation is `text`
    fn pieces(&self, text: &str) -> Vec<Piece> {
        let mut pieces = Vec::new();

        for (offset, sentence) in text.split_sentence_bound_indices() {
            let chars = sentence.chars().count();
            if chars <= self.chunk_size {
                pieces.push(Piece {
                    start: offset,
                    end: offset + sentence.len(),
                    chars,
                });
                continue;
            }

            for (word_offset, word) in sentence.split_word_bound_indices() {
                let start = offset + word_offset;
                let chars = word.chars().count();
                if chars <= self.chunk_size {
                    pieces.push(Piece {
                        start,
                        end: start + word.len(),
                        chars,
                    });
                } else {
                    self.hard_split(start, word, &mut pieces);
                }
            }
        }

        pieces
    }

    /// Cut an unbreakable run into `chunk_size`-char pieces
    fn hard_split(&self, base: usize, run: &str, pieces: &mut Vec<Piece>) {
        let mut start = 0usize;
        let mut chars = 0usize;

        for (idx, _) in run.char_indices() {
            if chars == self.chunk_size {
                pieces.push(Piece {
                    start: base + start,
                    end: base + idx,
                    chars,
                });
                start = idx;
                chars = 0;
            }
            chars += 1;
        }

        if chars > 0 {
            pieces.push(Piece {
                start: base + start,
                end: base + run.len(),
                chars,
            });
        }
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}
