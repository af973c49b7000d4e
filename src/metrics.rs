use std::io::Write;

use crate::walk::Walk;

/// Brotli quality used for compressibility estimates. Low quality keeps
/// `stats` fast on large programs.
const QUALITY: u32 = 2;
const LG_WINDOW: u32 = 22;

/// Brotli-compressed size of `bytes` over its raw size, or `None` for no bytes.
fn compressed_ratio(bytes: &[u8]) -> Option<f64> {
    if bytes.is_empty() {
        return None;
    }
    let mut writer = brotli::CompressorWriter::new(Vec::new(), 4096, QUALITY, LG_WINDOW);
    writer.write_all(bytes).ok()?;
    let compressed = writer.into_inner();
    Some(compressed.len() as f64 / bytes.len() as f64)
}

/// The opcode bytes a walk fetched, in order, operands left out.
pub fn opcode_stream(walk: &Walk) -> Vec<u8> {
    walk.instructions.iter().map(|inst| inst.opcode.byte()).collect()
}

/// How compressible a program is compared to the instructions decoded from it.
///
/// Operand bytes (immediates, payloads) usually look random while opcode
/// sequences repeat, so `opcodes` tends to sit well below `program` for a
/// program decoded with the right layout. A wrong layout misreads operands
/// as opcodes and pulls the two together.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Compressibility {
    /// Ratio over the raw program; `None` for an empty program.
    pub program: Option<f64>,
    /// Ratio over the fetched opcode stream; `None` only when the walk fetched nothing.
    pub opcodes: Option<f64>,
}

impl Compressibility {
    pub fn measure(program: &[u8], walk: &Walk) -> Self {
        Self {
            program: compressed_ratio(program),
            opcodes: compressed_ratio(&opcode_stream(walk)),
        }
    }
}

/// How often each opcode value was fetched during a walk, fallback `RETURN`s included.
pub fn opcode_histogram(walk: &Walk) -> [usize; 256] {
    let mut hist = [0usize; 256];
    for inst in &walk.instructions {
        hist[inst.opcode.byte() as usize] += 1;
    }
    hist
}

/// Byte value frequencies over a raw program.
pub fn byte_frequency_histogram(program: &[u8]) -> [usize; 256] {
    let mut hist = [0usize; 256];
    for &b in program {
        hist[b as usize] += 1;
    }
    hist
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::layout::Layout;
    use crate::walk::{WalkConfig, walk};

    /// `count` instructions of opcode 0x01 with a random u32 immediate, then RET.
    fn immediates_program(count: usize) -> Vec<u8> {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut program = Vec::with_capacity(count * 5 + 2);
        for _ in 0..count {
            program.push(0x01);
            program.extend_from_slice(&rng.r#gen::<u32>().to_le_bytes());
        }
        program.extend_from_slice(&[0x66, 0x00]);
        program
    }

    #[test]
    fn test_opcode_stream_skips_operands() {
        let program = [0x01, 0x34, 0x12, 0x02, 0x66, 0x00];
        let layout = Layout::from_specs(["0x01=u16"]).unwrap();
        let w = walk(&program, &layout, &WalkConfig::default());
        assert_eq!(opcode_stream(&w), vec![0x01, 0x02, 0x66]);
    }

    #[test]
    fn test_opcode_stream_includes_fallback_return() {
        let w = walk(&[], &Layout::default(), &WalkConfig::default());
        assert_eq!(opcode_stream(&w), vec![0x66]);
    }

    #[test]
    fn test_empty_program_has_no_program_ratio() {
        let w = walk(&[], &Layout::default(), &WalkConfig::default());
        let c = Compressibility::measure(&[], &w);
        assert_eq!(c.program, None);
        assert!(c.opcodes.is_some());
    }

    #[test]
    fn test_zero_step_walk_has_no_opcode_ratio() {
        let program = [0x01, 0x02, 0x66];
        let w = walk(&program, &Layout::default(), &WalkConfig { max_steps: 0 });
        let c = Compressibility::measure(&program, &w);
        assert!(c.program.is_some());
        assert_eq!(c.opcodes, None);
    }

    #[test]
    fn test_opcodes_compress_better_than_immediates() {
        let program = immediates_program(2048);
        let layout = Layout::from_specs(["0x01=u32"]).unwrap();
        let w = walk(&program, &layout, &WalkConfig::default());
        assert_eq!(w.steps, 2049);

        let c = Compressibility::measure(&program, &w);
        let program_ratio = c.program.unwrap();
        let opcode_ratio = c.opcodes.unwrap();
        assert!(program_ratio > 0.6, "random immediates should resist compression, got {program_ratio}");
        assert!(opcode_ratio < 0.1, "a repeated opcode should compress well, got {opcode_ratio}");
    }

    #[test]
    fn test_wrong_layout_pulls_ratios_together() {
        // Decoding without the u32 operands treats every immediate byte as an opcode.
        let program = immediates_program(2048);
        let right = walk(&program, &Layout::from_specs(["0x01=u32"]).unwrap(), &WalkConfig::default());
        let wrong = walk(&program, &Layout::default(), &WalkConfig::default());
        let right = Compressibility::measure(&program, &right).opcodes.unwrap();
        let wrong = Compressibility::measure(&program, &wrong).opcodes.unwrap();
        assert!(wrong > right * 4.0, "wrong layout {wrong} vs right layout {right}");
    }

    #[test]
    fn test_opcode_histogram_counts_fallback_return() {
        let program = [0x01, 0x01, 0x02];
        let w = walk(&program, &Layout::default(), &WalkConfig::default());
        let hist = opcode_histogram(&w);
        assert_eq!(hist[0x01], 2);
        // The trailing 0x02 is never fetched.
        assert_eq!(hist[0x02], 0);
        assert_eq!(hist[0x66], 1);
        assert_eq!(hist.iter().sum::<usize>(), w.steps);
    }

    #[test]
    fn test_byte_frequency_histogram() {
        let hist = byte_frequency_histogram(&[0, 0, 1, 255, 0, 1, 1, 2]);
        assert_eq!(hist[0], 3);
        assert_eq!(hist[1], 3);
        assert_eq!(hist[2], 1);
        assert_eq!(hist[255], 1);
        assert_eq!(hist[3], 0);
    }

    #[test]
    fn test_byte_frequency_histogram_empty() {
        let hist = byte_frequency_histogram(&[]);
        assert_eq!(hist.iter().sum::<usize>(), 0);
    }
}
