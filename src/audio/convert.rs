//! Sample format, channel and rate conversion for capture devices that
//! cannot deliver 44.1kHz mono natively.

/// Converts an f32 sample in [-1.0, 1.0] to 16-bit PCM (symmetric scaling)
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

#[inline]
pub fn u16_to_f32(sample: u16) -> f32 {
    (sample as f32 / u16::MAX as f32) * 2.0 - 1.0
}

/// Average interleaved channels down to mono
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Resample mono audio with linear interpolation
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let output_len = (samples.len() as f64 * ratio).round() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = match (samples.get(src_idx), samples.get(src_idx + 1)) {
            (Some(&a), Some(&b)) => a + (b - a) * frac,
            (Some(&a), None) => a,
            _ => *samples.last().unwrap_or(&0.0),
        };
        output.push(sample);
    }

    output
}

/// Brings one device block to mono at the target rate
pub fn normalize_block(samples: &[f32], channels: u16, from_rate: u32, to_rate: u32) -> Vec<f32> {
    let mono = downmix_to_mono(samples, channels);
    resample_linear(&mono, from_rate, to_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_to_i16_clamps() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), i16::MAX);
        assert_eq!(f32_to_i16(2.5), i16::MAX);
        assert_eq!(f32_to_i16(-3.0), i16::MIN);
    }

    #[test]
    fn test_sample_format_conversions() {
        assert_eq!(i16_to_f32(0), 0.0);
        assert!((i16_to_f32(16384) - 0.5).abs() < 1e-6);
        assert!((u16_to_f32(0) + 1.0).abs() < 1e-6);
        assert!((u16_to_f32(u16::MAX) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_downmix_stereo() {
        let stereo = [0.5, -0.5, 1.0, 0.0, 0.2, 0.4];
        let mono = downmix_to_mono(&stereo, 2);
        assert_eq!(mono.len(), 3);
        assert!((mono[0] - 0.0).abs() < 1e-6);
        assert!((mono[1] - 0.5).abs() < 1e-6);
        assert!((mono[2] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_resample_48k_to_44k() {
        let input = vec![0.25f32; 480];
        let output = resample_linear(&input, 48_000, 44_100);
        assert_eq!(output.len(), 441);
        assert!(output.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_linear(&input, 44_100, 44_100), input);
    }

    #[test]
    fn test_normalize_block() {
        let stereo_48k = vec![0.5f32; 960];
        let block = normalize_block(&stereo_48k, 2, 48_000, 44_100);
        assert_eq!(block.len(), 441);
    }
}
