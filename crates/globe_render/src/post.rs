//! Post-processing chain
//!
//! The chain mirrors a classic composer: the scene render, then bloom,
//! ambient occlusion, tone mapping and color correction. The scene pass
//! writes an offscreen target and every later stage runs in the composite
//! shader, driven by [`PostUniforms`]. The CPU tone and color curves here
//! match the shader's.

use serde::{Deserialize, Serialize};

use crate::pipeline::PostUniforms;

/// Tone-mapping curve constants
const TONE_A: f32 = 0.1;
const TONE_B: f32 = 0.5;
const TONE_C: f32 = 0.1;
const TONE_D: f32 = 0.5;
const TONE_E: f32 = 0.02;

/// One stage of the chain
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PostPass {
    Render,
    Bloom {
        strength: f32,
        radius: f32,
        threshold: f32,
    },
    AmbientOcclusion {
        kernel_radius: f32,
        min_distance: f32,
        max_distance: f32,
    },
    ToneMapping {
        exposure: f32,
    },
    ColorCorrection {
        pow_rgb: [f32; 3],
        mul_rgb: [f32; 3],
    },
}

impl PostPass {
    pub fn kind(&self) -> PostPassKind {
        match self {
            PostPass::Render => PostPassKind::Render,
            PostPass::Bloom { .. } => PostPassKind::Bloom,
            PostPass::AmbientOcclusion { .. } => PostPassKind::AmbientOcclusion,
            PostPass::ToneMapping { .. } => PostPassKind::ToneMapping,
            PostPass::ColorCorrection { .. } => PostPassKind::ColorCorrection,
        }
    }
}

/// Pass identity, used for toggling
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostPassKind {
    Render,
    Bloom,
    AmbientOcclusion,
    ToneMapping,
    ColorCorrection,
}

/// Parameters of every pass
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostSettings {
    pub enabled: bool,
    pub bloom_strength: f32,
    pub bloom_radius: f32,
    pub bloom_threshold: f32,
    pub ssao_kernel_radius: f32,
    pub ssao_min_distance: f32,
    pub ssao_max_distance: f32,
    pub exposure: f32,
    pub color_pow: [f32; 3],
    pub color_mul: [f32; 3],
}

impl Default for PostSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bloom_strength: 1.5,
            bloom_radius: 0.4,
            bloom_threshold: 0.85,
            ssao_kernel_radius: 16.0,
            ssao_min_distance: 0.005,
            ssao_max_distance: 0.1,
            exposure: 1.0,
            color_pow: [2.0; 3],
            color_mul: [1.0; 3],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Stage {
    pass: PostPass,
    enabled: bool,
}

/// Ordered, toggleable list of passes
#[derive(Clone, Debug, PartialEq)]
pub struct PostChain {
    stages: Vec<Stage>,
    width: u32,
    height: u32,
}

impl PostChain {
    /// Render → Bloom → SSAO → ToneMapping → ColorCorrection
    ///
    /// When `settings.enabled` is false only the render pass is active.
    pub fn from_config(settings: &PostSettings, width: u32, height: u32) -> Self {
        let passes = [
            PostPass::Render,
            PostPass::Bloom {
                strength: settings.bloom_strength,
                radius: settings.bloom_radius,
                threshold: settings.bloom_threshold,
            },
            PostPass::AmbientOcclusion {
                kernel_radius: settings.ssao_kernel_radius,
                min_distance: settings.ssao_min_distance,
                max_distance: settings.ssao_max_distance,
            },
            PostPass::ToneMapping {
                exposure: settings.exposure,
            },
            PostPass::ColorCorrection {
                pow_rgb: settings.color_pow,
                mul_rgb: settings.color_mul,
            },
        ];
        let stages = passes
            .into_iter()
            .map(|pass| Stage {
                enabled: settings.enabled || pass == PostPass::Render,
                pass,
            })
            .collect();
        Self {
            stages,
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn passes(&self) -> impl Iterator<Item = &PostPass> {
        self.stages.iter().map(|s| &s.pass)
    }

    /// Passes that will run, in order
    pub fn enabled_passes(&self) -> impl Iterator<Item = &PostPass> {
        self.stages.iter().filter(|s| s.enabled).map(|s| &s.pass)
    }

    pub fn get(&self, kind: PostPassKind) -> Option<&PostPass> {
        self.stages.iter().find(|s| s.pass.kind() == kind).map(|s| &s.pass)
    }

    pub fn is_enabled(&self, kind: PostPassKind) -> bool {
        self.stages.iter().any(|s| s.enabled && s.pass.kind() == kind)
    }

    pub fn set_enabled(&mut self, kind: PostPassKind, enabled: bool) {
        if kind == PostPassKind::Render {
            return;
        }
        for stage in self.stages.iter_mut().filter(|s| s.pass.kind() == kind) {
            stage.enabled = enabled;
        }
    }

    /// Flip a pass on or off; returns the new state
    ///
    /// The render pass cannot be turned off.
    pub fn toggle(&mut self, kind: PostPassKind) -> bool {
        let enabled = !self.is_enabled(kind);
        self.set_enabled(kind, enabled);
        log::debug!("Post pass {:?} enabled: {}", kind, self.is_enabled(kind));
        self.is_enabled(kind)
    }

    /// Track the output size
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Run the enabled color passes over one linear RGB value
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        self.enabled_passes().fold(rgb, |color, pass| match *pass {
            PostPass::ToneMapping { exposure } => tone_map(color, exposure),
            PostPass::ColorCorrection { pow_rgb, mul_rgb } => color_correct(color, pow_rgb, mul_rgb),
            _ => color,
        })
    }

    /// Copy the enabled passes' parameters into the composite uniforms
    ///
    /// Disabled passes get a zero switch lane and are skipped by the shader.
    pub fn write_uniforms(&self, uniforms: &mut PostUniforms) {
        uniforms.bloom = [0.0; 4];
        uniforms.ssao = [0.0; 4];
        uniforms.tone_mapping = 0.0;
        uniforms.color_correction = 0.0;
        uniforms.texel_size = [1.0 / self.width as f32, 1.0 / self.height as f32];
        for pass in self.enabled_passes() {
            match *pass {
                PostPass::Render => {}
                PostPass::Bloom { strength, radius, threshold } => {
                    uniforms.bloom = [strength, radius, threshold, 1.0];
                }
                PostPass::AmbientOcclusion { kernel_radius, min_distance, max_distance } => {
                    uniforms.ssao = [kernel_radius, min_distance, max_distance, 1.0];
                }
                PostPass::ToneMapping { exposure } => {
                    uniforms.exposure = exposure;
                    uniforms.tone_mapping = 1.0;
                }
                PostPass::ColorCorrection { pow_rgb, mul_rgb } => {
                    uniforms.color_pow = pow_rgb;
                    uniforms.color_mul = mul_rgb;
                    uniforms.color_correction = 1.0;
                }
            }
        }
    }
}

/// Scale by exposure, then apply the neutral filmic curve per channel
pub fn tone_map(rgb: [f32; 3], exposure: f32) -> [f32; 3] {
    rgb.map(|v| {
        let c = (v * exposure).max(0.0);
        (c * (TONE_A * c + TONE_C * TONE_B) + TONE_D * TONE_E) / (c * (TONE_A * c + TONE_B) + TONE_D)
    })
}

/// `mul · pow(rgb, pow)` per channel
pub fn color_correct(rgb: [f32; 3], pow_rgb: [f32; 3], mul_rgb: [f32; 3]) -> [f32; 3] {
    [
        mul_rgb[0] * rgb[0].max(0.0).powf(pow_rgb[0]),
        mul_rgb[1] * rgb[1].max(0.0).powf(pow_rgb[1]),
        mul_rgb[2] * rgb[2].max(0.0).powf(pow_rgb[2]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn test_chain_order() {
        let chain = PostChain::from_config(&PostSettings::default(), 800, 600);
        let kinds: Vec<_> = chain.passes().map(PostPass::kind).collect();
        assert_eq!(
            kinds,
            vec![
                PostPassKind::Render,
                PostPassKind::Bloom,
                PostPassKind::AmbientOcclusion,
                PostPassKind::ToneMapping,
                PostPassKind::ColorCorrection,
            ]
        );
        assert_eq!(
            chain.get(PostPassKind::Bloom),
            Some(&PostPass::Bloom { strength: 1.5, radius: 0.4, threshold: 0.85 })
        );
    }

    #[test]
    fn test_toggle() {
        let mut chain = PostChain::from_config(&PostSettings::default(), 800, 600);
        assert!(!chain.toggle(PostPassKind::Bloom));
        assert!(chain.toggle(PostPassKind::Bloom));
        assert!(chain.toggle(PostPassKind::Render));
        assert_eq!(chain.enabled_passes().count(), 5);
    }

    #[test]
    fn test_disabled_chain_only_renders() {
        let settings = PostSettings { enabled: false, ..PostSettings::default() };
        let chain = PostChain::from_config(&settings, 0, 0);
        assert_eq!(chain.enabled_passes().count(), 1);
        assert_eq!(chain.size(), (1, 1));
        assert_eq!(chain.apply([0.3, 0.6, 0.9]), [0.3, 0.6, 0.9]);
    }

    #[test]
    fn test_tone_curve() {
        // Black maps to e
        assert!(close(tone_map([0.0; 3], 1.0), [0.02; 3]));
        // (0.1 + 0.05 + 0.01) / (0.1 + 0.5 + 0.5)
        assert!(close(tone_map([1.0; 3], 1.0), [0.16 / 1.1; 3]));
        // Exposure scales the input first
        assert!(close(tone_map([0.5; 3], 2.0), tone_map([1.0; 3], 1.0)));
        let bright = tone_map([100.0; 3], 1.0)[0];
        assert!(bright < 1.0 && bright > tone_map([1.0; 3], 1.0)[0]);
    }

    #[test]
    fn test_color_correction() {
        assert!(close(color_correct([0.5, 1.0, 0.0], [2.0; 3], [1.0; 3]), [0.25, 1.0, 0.0]));
        assert!(close(color_correct([0.5; 3], [1.0; 3], [2.0, 1.0, 0.0]), [1.0, 0.5, 0.0]));
    }

    #[test]
    fn test_uniforms_follow_toggles() {
        let mut chain = PostChain::from_config(&PostSettings::default(), 64, 64);
        let mut uniforms = PostUniforms::default();
        chain.write_uniforms(&mut uniforms);
        assert_eq!(uniforms.tone_mapping, 1.0);
        assert_eq!(uniforms.color_correction, 1.0);
        assert_eq!(uniforms.color_pow, [2.0; 3]);
        assert_eq!(uniforms.texel_size, [1.0 / 64.0; 2]);

        chain.toggle(PostPassKind::ColorCorrection);
        chain.write_uniforms(&mut uniforms);
        assert_eq!(uniforms.color_correction, 0.0);

        chain.resize(1920, 1080);
        assert_eq!(chain.size(), (1920, 1080));
        chain.write_uniforms(&mut uniforms);
        assert_eq!(uniforms.texel_size, [1.0 / 1920.0, 1.0 / 1080.0]);
    }

    #[test]
    fn test_bloom_and_ssao_reach_uniforms() {
        let settings = PostSettings {
            bloom_strength: 2.0,
            ssao_kernel_radius: 8.0,
            ..PostSettings::default()
        };
        let mut chain = PostChain::from_config(&settings, 64, 64);
        let mut uniforms = PostUniforms::default();
        chain.write_uniforms(&mut uniforms);
        assert_eq!(uniforms.bloom, [2.0, 0.4, 0.85, 1.0]);
        assert_eq!(uniforms.ssao, [8.0, 0.005, 0.1, 1.0]);

        chain.toggle(PostPassKind::Bloom);
        chain.write_uniforms(&mut uniforms);
        assert_eq!(uniforms.bloom[3], 0.0);
        assert_eq!(uniforms.ssao[3], 1.0);

        chain.toggle(PostPassKind::AmbientOcclusion);
        chain.write_uniforms(&mut uniforms);
        assert_eq!(uniforms.ssao, [0.0; 4]);
    }

    #[test]
    fn test_disabled_chain_writes_pass_through_uniforms() {
        let settings = PostSettings { enabled: false, ..PostSettings::default() };
        let chain = PostChain::from_config(&settings, 32, 32);
        let mut uniforms = PostUniforms::default();
        chain.write_uniforms(&mut uniforms);
        assert_eq!(uniforms.bloom[3], 0.0);
        assert_eq!(uniforms.ssao[3], 0.0);
        assert_eq!(uniforms.tone_mapping, 0.0);
        assert_eq!(uniforms.color_correction, 0.0);
    }
}
