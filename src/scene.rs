use super::*;

/// One cell of the scene buffer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Texel {
    pub emission: Radiance,
    pub extinction: Extinction,
    /// Reflectance, only read when re-emitting light between bounces.
    pub diffuse: Radiance,
}
impl Texel {
    pub fn color(&self) -> Color {
        Color::new(self.emission, self.extinction)
    }
    pub fn is_solid(&self) -> bool {
        self.extinction > 0.0
    }
}

/// Half-open rectangle of cells, `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub min: UVec2,
    pub max: UVec2,
}
impl Rect {
    pub fn new(min: UVec2, max: UVec2) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionKind {
    Emitter { color: Radiance, strength: f32 },
    Occluder { extinction: Extinction, diffuse: Radiance },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub rect: Rect,
    pub kind: RegionKind,
}

const PAGENAME: Tag = Tag::Unknown(285);

/// Emission and extinction grid read by the cascade passes.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    size: UVec2,
    texels: Vec<Texel>,
}

impl Scene {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: UVec2::new(width, height),
            texels: vec![Texel::default(); width as usize * height as usize],
        }
    }
    pub fn size(&self) -> UVec2 {
        self.size
    }
    pub fn width(&self) -> u32 {
        self.size.x
    }
    pub fn height(&self) -> u32 {
        self.size.y
    }
    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width() || y as u32 >= self.height() {
            return None;
        }
        Some(y as usize * self.width() as usize + x as usize)
    }
    pub fn get(&self, cell: IVec2) -> Option<&Texel> {
        self.offset(cell.x, cell.y).map(|i| &self.texels[i])
    }
    pub fn color(&self, cell: IVec2) -> Option<Color> {
        self.get(cell).map(Texel::color)
    }
    pub fn texels(&self) -> &[Texel] {
        &self.texels
    }
    /// Overwrites emission and extinction of one cell. Out-of-range cells are ignored.
    pub fn write_texel(&mut self, x: i32, y: i32, emission: Radiance, extinction: Extinction) {
        if let Some(i) = self.offset(x, y) {
            self.texels[i].emission = emission;
            self.texels[i].extinction = extinction;
        }
    }
    pub fn write_diffuse(&mut self, x: i32, y: i32, diffuse: Radiance) {
        if let Some(i) = self.offset(x, y) {
            self.texels[i].diffuse = diffuse;
        }
    }
    pub fn set_emission(&mut self, emission: impl Fn(&Texel, usize) -> Radiance) {
        for (i, texel) in self.texels.iter_mut().enumerate() {
            texel.emission = emission(texel, i);
        }
    }
    pub fn clear(&mut self) {
        self.texels.fill(Texel::default());
    }

    /// Writes the regions in order; later regions win where they overlap.
    pub fn bake(&mut self, regions: &[Region]) {
        for region in regions {
            let max = region.rect.max.min(self.size);
            for y in region.rect.min.y..max.y {
                for x in region.rect.min.x..max.x {
                    let i = y as usize * self.width() as usize + x as usize;
                    let texel = &mut self.texels[i];
                    match region.kind {
                        RegionKind::Emitter { color, strength } => {
                            texel.emission = color * strength;
                            if !texel.is_solid() {
                                texel.extinction = 0.0;
                            }
                        }
                        RegionKind::Occluder {
                            extinction,
                            diffuse,
                        } => {
                            texel.extinction = extinction;
                            texel.diffuse = diffuse;
                        }
                    }
                }
            }
        }
    }

    /// Copy of the scene turned counterclockwise by `quarter_turns` quarter turns,
    /// so that rays along `+x` in the copy travel along the matching axis of `self`.
    pub fn rotated(&self, quarter_turns: u32) -> Scene {
        let size = rotated_size(self.size, quarter_turns);
        let mut texels = Vec::with_capacity(self.texels.len());
        for y in 0..size.y {
            for x in 0..size.x {
                let source = unrotate(self.size, quarter_turns, UVec2::new(x, y));
                texels.push(self.texels[source.y as usize * self.width() as usize + source.x as usize]);
            }
        }
        Scene { size, texels }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut file = TiffDecoder::new(file)?;
        let (width, height) = file.dimensions()?;
        let mut scene = Scene::new(width, height);

        let mut load = |name: &str, channels: usize| -> Result<Vec<f32>> {
            let page = file.get_tag_ascii_string(PAGENAME)?;
            if page != name {
                return Err(Error::SceneFormat(format!(
                    "expected page {name:?}, found {page:?}"
                )));
            }
            let expected = if channels == 3 {
                ColorType::RGB(32)
            } else {
                ColorType::Gray(32)
            };
            if file.colortype()? != expected || file.dimensions()? != (width, height) {
                return Err(Error::SceneFormat(format!("page {name:?} has the wrong layout")));
            }
            let DecodingResult::F32(image) = file.read_image()? else {
                return Err(Error::SceneFormat(format!("page {name:?} is not 32-bit float")));
            };
            if file.more_images() {
                file.next_image()?;
            }
            Ok(image)
        };
        let emission = load("emission", 3)?;
        let diffuse = load("diffuse", 3)?;
        let extinction = load("extinction", 1)?;

        for (i, texel) in scene.texels.iter_mut().enumerate() {
            texel.emission = FVec3::from_slice(&emission[3 * i..3 * i + 3]);
            texel.diffuse = FVec3::from_slice(&diffuse[3 * i..3 * i + 3]);
            texel.extinction = extinction[i];
        }
        log::info!("Loaded {}x{} scene from {:?}", width, height, path.as_ref());
        Ok(scene)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut file = TiffEncoder::new(file)?;

        let emission = self
            .texels
            .iter()
            .flat_map(|t| t.emission.to_array())
            .collect::<Vec<_>>();
        let diffuse = self
            .texels
            .iter()
            .flat_map(|t| t.diffuse.to_array())
            .collect::<Vec<_>>();
        let extinction = self.texels.iter().map(|t| t.extinction).collect::<Vec<_>>();

        for (name, data) in [("emission", &emission), ("diffuse", &diffuse)] {
            let mut image = file.new_image::<colortype::RGB32Float>(self.width(), self.height())?;
            image.encoder().write_tag(PAGENAME, name)?;
            image.write_data(data)?;
        }
        let mut image = file.new_image::<colortype::Gray32Float>(self.width(), self.height())?;
        image.encoder().write_tag(PAGENAME, "extinction")?;
        image.write_data(&extinction)?;

        log::info!("Saved scene to {:?}", path.as_ref());
        Ok(())
    }
}

pub fn rotated_size(size: UVec2, quarter_turns: u32) -> UVec2 {
    if quarter_turns % 2 == 1 {
        UVec2::new(size.y, size.x)
    } else {
        size
    }
}

/// Maps a cell of the rotated scene back to the cell of the `size`d source it came from.
pub fn unrotate(size: UVec2, quarter_turns: u32, cell: UVec2) -> UVec2 {
    let UVec2 { x, y } = cell;
    match quarter_turns % 4 {
        0 => UVec2::new(x, y),
        1 => UVec2::new(size.x - 1 - y, x),
        2 => UVec2::new(size.x - 1 - x, size.y - 1 - y),
        _ => UVec2::new(y, size.y - 1 - x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_writes_are_ignored() {
        let mut scene = Scene::new(4, 4);
        scene.write_texel(-1, 0, Radiance::ONE, 1.0);
        scene.write_texel(0, 4, Radiance::ONE, 1.0);
        scene.write_texel(4, 4, Radiance::ONE, 1.0);
        assert!(scene.texels().iter().all(|t| *t == Texel::default()));
        scene.write_texel(3, 3, Radiance::ONE, 2.0);
        assert_eq!(scene.get(IVec2::new(3, 3)).unwrap().extinction, 2.0);
        scene.clear();
        assert!(scene.texels().iter().all(|t| *t == Texel::default()));
    }

    #[test]
    fn bake_respects_solid_cells() {
        let mut scene = Scene::new(8, 8);
        scene.bake(&[
            Region {
                rect: Rect::new(UVec2::new(0, 0), UVec2::new(4, 4)),
                kind: RegionKind::Occluder {
                    extinction: 10.0,
                    diffuse: Radiance::splat(0.5),
                },
            },
            Region {
                rect: Rect::new(UVec2::new(2, 2), UVec2::new(6, 6)),
                kind: RegionKind::Emitter {
                    color: Radiance::new(1.0, 0.5, 0.25),
                    strength: 4.0,
                },
            },
        ]);
        let solid = scene.get(IVec2::new(3, 3)).unwrap();
        assert_eq!(solid.emission, Radiance::new(4.0, 2.0, 1.0));
        assert_eq!(solid.extinction, 10.0);
        let open = scene.get(IVec2::new(5, 5)).unwrap();
        assert_eq!(open.emission, Radiance::new(4.0, 2.0, 1.0));
        assert_eq!(open.extinction, 0.0);
        assert_eq!(scene.get(IVec2::new(6, 6)).unwrap().emission, Radiance::ZERO);
    }

    #[test]
    fn occluders_keep_emission() {
        let mut scene = Scene::new(4, 4);
        scene.write_texel(1, 1, Radiance::splat(3.0), 0.0);
        scene.bake(&[Region {
            rect: Rect::new(UVec2::new(0, 0), UVec2::new(10, 10)),
            kind: RegionKind::Occluder {
                extinction: 2.0,
                diffuse: Radiance::ZERO,
            },
        }]);
        let texel = scene.get(IVec2::new(1, 1)).unwrap();
        assert_eq!(texel.emission, Radiance::splat(3.0));
        assert_eq!(texel.extinction, 2.0);
    }

    #[test]
    fn odd_turns_swap_the_axes() {
        let size = UVec2::new(5, 3);
        assert_eq!(rotated_size(size, 0), size);
        assert_eq!(rotated_size(size, 1), UVec2::new(3, 5));
        assert_eq!(rotated_size(size, 2), size);
        assert_eq!(rotated_size(size, 3), UVec2::new(3, 5));
        let scene = Scene::new(5, 3).rotated(1);
        assert_eq!((scene.width(), scene.height()), (3, 5));
    }

    #[test]
    fn rotations_cover_every_cell_once() {
        let size = UVec2::new(5, 3);
        for turns in 0..4 {
            let rotated = rotated_size(size, turns);
            let mut seen = vec![false; 15];
            for y in 0..rotated.y {
                for x in 0..rotated.x {
                    let source = unrotate(size, turns, UVec2::new(x, y));
                    assert!(source.x < size.x && source.y < size.y);
                    let i = (source.y * size.x + source.x) as usize;
                    assert!(!seen[i]);
                    seen[i] = true;
                }
            }
            assert!(seen.iter().all(|s| *s));
        }
    }

    #[test]
    fn rotated_scene_moves_texels() {
        let mut scene = Scene::new(4, 2);
        scene.write_texel(3, 0, Radiance::ONE, 0.0);
        let rotated = scene.rotated(1);
        assert_eq!(rotated.size(), UVec2::new(2, 4));
        // Source (W-1-y, x) = (3, 0) is rotated cell (0, 0).
        assert_eq!(rotated.get(IVec2::new(0, 0)).unwrap().emission, Radiance::ONE);
    }

    #[test]
    fn tiff_round_trip() {
        let mut scene = Scene::new(6, 5);
        scene.write_texel(1, 2, Radiance::new(1.0, 2.0, 3.0), 0.5);
        scene.write_diffuse(4, 4, Radiance::splat(0.75));
        let path = std::env::temp_dir().join(format!("hrc-scene-{}.tiff", std::process::id()));
        scene.save(&path).unwrap();
        let loaded = Scene::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, scene);
    }
}
