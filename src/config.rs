use crate::models::SourceInfo;

/// Static configuration for one origin site. Immutable at run time; the
/// pipeline only annotates the per-run report with counts.
pub struct SourceConfig {
    pub id: &'static str,
    pub name: &'static str,
    pub url: &'static str,
    pub color: &'static str,
}

impl SourceConfig {
    pub fn info(&self) -> SourceInfo {
        SourceInfo {
            id: self.id.to_string(),
            name: self.name.to_string(),
            url: self.url.to_string(),
            color: self.color.to_string(),
        }
    }
}

pub static MSU_FOUNDATION: SourceConfig = SourceConfig {
    id: "msu-foundation",
    name: "MSU Foundation",
    url: "https://msufoundation.org/events/",
    color: "#18453B",
};

pub static START_GARDEN: SourceConfig = SourceConfig {
    id: "start-garden",
    name: "Start Garden",
    url: "https://startgarden.com/events/",
    color: "#FF6B35",
};

pub static BAMBOO: SourceConfig = SourceConfig {
    id: "bamboo",
    name: "Bamboo Cowork",
    url: "https://www.bamboocowork.com/events-at-bamboo",
    color: "#4CAF50",
};

pub static GRAND_RAPIDS_ORG: SourceConfig = SourceConfig {
    id: "grand-rapids-org",
    name: "GR Chamber of Commerce",
    url: "https://grandrapids.org/events/",
    color: "#2196F3",
};

pub static GR_JUNIOR_CHAMBER: SourceConfig = SourceConfig {
    id: "gr-junior-chamber",
    name: "GR Junior Chamber",
    url: "https://www.grjuniorchamber.com/",
    color: "#9C27B0",
};

pub static RIGHT_PLACE: SourceConfig = SourceConfig {
    id: "right-place",
    name: "The Right Place",
    url: "https://www.rightplace.org/events/",
    color: "#1E3A5F",
};

pub static STARTUP_GARAGE: SourceConfig = SourceConfig {
    id: "startup-garage",
    name: "Startup Garage",
    url: "https://www.startupgarage.org/events",
    color: "#E65100",
};
