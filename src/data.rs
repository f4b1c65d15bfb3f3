use super::*;

pub const MAX_BOUNCES: u32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Used when a scene description does not give its own size.
    pub scene_size: [u32; 2],
    pub bounce_count: u32,
    /// Worker threads; `None` lets rayon decide.
    pub threads: Option<usize>,
    /// Compose all four quarter turns. Otherwise only light travelling along `-x` is gathered.
    pub quadrants: bool,
    pub exposure: f32,
    /// Reflectance of occluders that do not name their own.
    pub diffuse: f32,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            scene_size: [256, 256],
            bounce_count: 1,
            threads: None,
            quadrants: true,
            exposure: 1.0,
            diffuse: 0.0,
        }
    }
}
impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let settings: Settings = ron::de::from_reader(File::open(path.as_ref())?)?;
        settings.validate()?;
        Ok(settings)
    }
    /// Loads `path` if it exists, otherwise falls back to the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if std::fs::exists(path).unwrap_or(false) {
            Self::load(path)
        } else {
            log::info!("No settings at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }
    pub fn validate(&self) -> Result<()> {
        if self.scene_size.contains(&0) {
            return Err(Error::InvalidConfiguration(format!(
                "scene size must be non-zero, got {:?}",
                self.scene_size
            )));
        }
        if self.threads == Some(0) {
            return Err(Error::InvalidConfiguration(
                "thread count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
    pub fn bounces(&self) -> u32 {
        let bounces = self.bounce_count.clamp(1, MAX_BOUNCES);
        if bounces != self.bounce_count {
            log::warn!(
                "Bounce count {} out of range, using {}",
                self.bounce_count,
                bounces
            );
        }
        bounces
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    Repeat(f32),
    Vector(FVec3),
    Css(String),
}
impl ColorSpec {
    pub fn as_vec3(&self) -> Result<Radiance> {
        match self {
            Self::Repeat(value) => Ok(Radiance::splat(*value)),
            Self::Vector(value) => Ok(*value),
            Self::Css(name) => {
                let color = csscolorparser::parse(name).map_err(|e| {
                    Error::InvalidConfiguration(format!("bad color {name:?}: {e}"))
                })?;
                Ok(Radiance::new(color.r as f32, color.g as f32, color.b as f32))
            }
        }
    }
}

fn one() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegionKindDescription {
    Emitter {
        color: ColorSpec,
        #[serde(default = "one")]
        strength: f32,
    },
    Occluder {
        extinction: f32,
        #[serde(default)]
        diffuse: Option<ColorSpec>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDescription {
    pub min: [u32; 2],
    pub max: [u32; 2],
    pub kind: RegionKindDescription,
}
impl RegionDescription {
    pub fn resolve(&self, settings: &Settings) -> Result<Region> {
        let kind = match &self.kind {
            RegionKindDescription::Emitter { color, strength } => RegionKind::Emitter {
                color: color.as_vec3()?,
                strength: *strength,
            },
            RegionKindDescription::Occluder {
                extinction,
                diffuse,
            } => {
                if *extinction < 0.0 {
                    return Err(Error::InvalidConfiguration(format!(
                        "extinction must be non-negative, got {extinction}"
                    )));
                }
                RegionKind::Occluder {
                    extinction: *extinction,
                    diffuse: match diffuse {
                        Some(diffuse) => diffuse.as_vec3()?,
                        None => Radiance::splat(settings.diffuse),
                    },
                }
            }
        };
        Ok(Region {
            rect: Rect::new(UVec2::from(self.min), UVec2::from(self.max)),
            kind,
        })
    }
}

/// Rectangles of light and matter, baked in order.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub size: Option<[u32; 2]>,
    pub regions: Vec<RegionDescription>,
}
impl SceneDescription {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(ron::de::from_reader(File::open(path.as_ref())?)?)
    }
    pub fn build(&self, settings: &Settings) -> Result<Scene> {
        let [width, height] = self.size.unwrap_or(settings.scene_size);
        if width == 0 || height == 0 {
            return Err(Error::InvalidConfiguration(format!(
                "scene size must be non-zero, got {width}x{height}"
            )));
        }
        let regions = self
            .regions
            .iter()
            .map(|region| region.resolve(settings))
            .collect::<Result<Vec<_>>>()?;
        let mut scene = Scene::new(width, height);
        scene.bake(&regions);
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_fill_in_defaults() {
        let settings: Settings = ron::from_str("(bounce_count: 3, exposure: 2.0)").unwrap();
        assert_eq!(settings.bounce_count, 3);
        assert_eq!(settings.exposure, 2.0);
        assert_eq!(settings.scene_size, [256, 256]);
        assert!(settings.quadrants);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn settings_file_is_optional() {
        let missing = std::env::temp_dir().join(format!("hrc-missing-{}.ron", std::process::id()));
        assert_eq!(Settings::load_or_default(&missing).unwrap(), Settings::default());

        let path = std::env::temp_dir().join(format!("hrc-settings-{}.ron", std::process::id()));
        std::fs::write(&path, "(diffuse: 0.5, bounce_count: 2)").unwrap();
        let loaded = Settings::load_or_default(&path);
        std::fs::remove_file(&path).unwrap();
        let loaded = loaded.unwrap();
        assert_eq!(loaded.diffuse, 0.5);
        assert_eq!(loaded.bounce_count, 2);

        let path = std::env::temp_dir().join(format!("hrc-invalid-{}.ron", std::process::id()));
        std::fs::write(&path, "(scene_size: (0, 4))").unwrap();
        let invalid = Settings::load_or_default(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(invalid.is_err());
    }

    #[test]
    fn bounces_are_clamped() {
        let settings = Settings {
            bounce_count: 9,
            ..Settings::default()
        };
        assert_eq!(settings.bounces(), MAX_BOUNCES);
        let settings = Settings {
            bounce_count: 0,
            ..Settings::default()
        };
        assert_eq!(settings.bounces(), 1);
    }

    #[test]
    fn zero_sized_scene_is_rejected() {
        let settings = Settings {
            scene_size: [0, 64],
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn scene_description_bakes() {
        let description: SceneDescription = ron::from_str(
            r##"(
                size: Some((16, 8)),
                regions: [
                    (min: (1, 1), max: (3, 3), kind: Emitter(color: "#ff0000", strength: 5.0)),
                    (min: (2, 0), max: (4, 8), kind: Occluder(extinction: 10.0)),
                    (min: (10, 2), max: (11, 3), kind: Emitter(color: 0.5)),
                ],
            )"##,
        )
        .unwrap();
        let settings = Settings {
            diffuse: 0.25,
            ..Settings::default()
        };
        let scene = description.build(&settings).unwrap();
        assert_eq!(scene.size(), UVec2::new(16, 8));
        let red = scene.get(IVec2::new(1, 1)).unwrap();
        assert_eq!(red.emission, Radiance::new(5.0, 0.0, 0.0));
        assert_eq!(red.extinction, 0.0);
        let covered = scene.get(IVec2::new(2, 2)).unwrap();
        assert_eq!(covered.emission, Radiance::new(5.0, 0.0, 0.0));
        assert_eq!(covered.extinction, 10.0);
        assert_eq!(covered.diffuse, Radiance::splat(0.25));
        assert_eq!(
            scene.get(IVec2::new(10, 2)).unwrap().emission,
            Radiance::splat(0.5)
        );
    }

    #[test]
    fn bad_css_color_is_reported() {
        let color = ColorSpec::Css("not-a-color".to_string());
        assert!(matches!(
            color.as_vec3(),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
