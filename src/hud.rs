// ============================================================================
// hud.rs — GpuFlock
// Text overlay via glyphon: flock size, timing and run state.
// ============================================================================

use glyphon::{
    Attrs, Buffer as TextBuffer, Cache as GlyphCache, Color as GlyphColor, Family, FontSystem,
    Metrics, Resolution, Shaping, SwashCache, TextArea, TextAtlas, TextBounds, TextRenderer,
    Viewport as GlyphViewport,
};

use crate::driver::RunState;

/// Values shown on the overlay for one frame.
pub struct HudStats {
    pub boids: u32,
    pub obstacles: u32,
    pub work_groups: u32,
    pub frame: u64,
    pub fps: f32,
    pub state: RunState,
    pub inert: bool,
}

pub struct HudRenderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
    glyph_viewport: GlyphViewport,
    text_atlas: TextAtlas,
    text_renderer: TextRenderer,
    text: TextBuffer,
    pub visible: bool,
}

impl HudRenderer {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, surface_format: wgpu::TextureFormat) -> Self {
        let mut font_system = FontSystem::new();
        let swash_cache = SwashCache::new();
        let glyph_cache = GlyphCache::new(device);
        let glyph_viewport = GlyphViewport::new(device, &glyph_cache);
        let mut text_atlas = TextAtlas::new(device, queue, &glyph_cache, surface_format);
        let text_renderer =
            TextRenderer::new(&mut text_atlas, device, wgpu::MultisampleState::default(), None);
        let text = TextBuffer::new(&mut font_system, Metrics::new(14.0, 18.0));

        Self {
            font_system,
            swash_cache,
            glyph_viewport,
            text_atlas,
            text_renderer,
            text,
            visible: true,
        }
    }

    /// Lay out the overlay text for this frame.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        stats: &HudStats,
        width: u32,
        height: u32,
    ) {
        self.glyph_viewport.update(queue, Resolution { width, height });

        self.text
            .set_size(&mut self.font_system, Some(width as f32), Some(height as f32));
        self.text.set_text(
            &mut self.font_system,
            &hud_text(stats),
            Attrs::new().family(Family::Monospace),
            Shaping::Basic,
        );
        self.text.shape_until_scroll(&mut self.font_system, false);

        let prepared = self.text_renderer.prepare(
            device,
            queue,
            &mut self.font_system,
            &mut self.text_atlas,
            &self.glyph_viewport,
            [TextArea {
                buffer: &self.text,
                left: 10.0,
                top: 10.0,
                scale: 1.0,
                bounds: TextBounds {
                    left: 0,
                    top: 0,
                    right: width as i32,
                    bottom: height as i32,
                },
                default_color: GlyphColor::rgb(220, 220, 220),
                custom_glyphs: &[],
            }],
            &mut self.swash_cache,
        );
        if let Err(err) = prepared {
            log::warn!("HUD prepare failed: {}", err);
        }
    }

    /// Draw the prepared text over `view` in its own pass.
    pub fn render(&self, device: &wgpu::Device, queue: &wgpu::Queue, view: &wgpu::TextureView) {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("hud_encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("hud_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            if let Err(err) = self
                .text_renderer
                .render(&self.text_atlas, &self.glyph_viewport, &mut pass)
            {
                log::warn!("HUD render failed: {}", err);
            }
        }
        queue.submit(std::iter::once(encoder.finish()));
    }

    /// Trim the glyph atlas after presenting.
    pub fn trim(&mut self) {
        self.text_atlas.trim();
    }
}

fn hud_text(stats: &HudStats) -> String {
    if stats.inert {
        return "Flock unavailable (kernel or mesh missing)\nESC: Quit".to_string();
    }
    let status = match stats.state {
        RunState::Running => "",
        RunState::Paused => " [PAUSED]",
    };
    format!(
        "Boids: {}   Obstacles: {}   Groups: {}\n\
         Frame: {}   FPS: {:.0}{}\n\
         Space: Pause | R: Restart | +/-: Obstacle radius | H: HUD | WASD/QE: Camera",
        stats.boids, stats.obstacles, stats.work_groups, stats.frame, stats.fps, status,
    )
}
