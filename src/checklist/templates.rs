//! Static per-stage checklist templates
//!
//! Editing a template only affects checklists generated afterwards; items
//! already instantiated on a song keep the definition they were created with.

use super::validators::{Collection, CustomCheck, Entity, Field, ValidationRule};
use crate::assets::AssetType;
use crate::models::{RightType, Stage};

/// Definition of one checklist item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemTemplate {
    pub category: &'static str,
    pub item_name: &'static str,
    pub description: &'static str,
    pub order: u32,
    pub required: bool,
    pub rule: ValidationRule,
    pub help_text: Option<&'static str>,
}

const fn manual(
    category: &'static str,
    item_name: &'static str,
    description: &'static str,
    order: u32,
    required: bool,
    help_text: Option<&'static str>,
) -> ItemTemplate {
    ItemTemplate {
        category,
        item_name,
        description,
        order,
        required,
        rule: ValidationRule::Manual,
        help_text,
    }
}

const PUBLISHING: &[ItemTemplate] = &[
    ItemTemplate {
        category: "Work Setup",
        item_name: "Work entity created",
        description: "Create a Work and link it to this song",
        order: 1,
        required: true,
        rule: ValidationRule::AutoEntityExists {
            entity: Entity::Work,
        },
        help_text: Some("Create the work with `songflow catalog work`"),
    },
    ItemTemplate {
        category: "Work Setup",
        item_name: "ISWC assigned",
        description: "Work must have an ISWC code",
        order: 2,
        required: true,
        rule: ValidationRule::AutoFieldExists {
            entity: Entity::Work,
            field: Field::Iswc,
        },
        help_text: Some("ISWC can be assigned automatically or requested from registry"),
    },
    ItemTemplate {
        category: "Writer Splits",
        item_name: "At least 1 writer added",
        description: "Work must have at least one writer",
        order: 3,
        required: true,
        rule: ValidationRule::AutoCountMinimum {
            collection: Collection::WorkWriters,
            min_count: 1,
        },
        help_text: None,
    },
    ItemTemplate {
        category: "Writer Splits",
        item_name: "Writer splits = 100%",
        description: "All writer splits must total exactly 100%",
        order: 4,
        required: true,
        rule: ValidationRule::AutoSplitValidated {
            entity: Entity::Work,
            split_type: RightType::Writer,
            skip_if_empty: false,
        },
        help_text: None,
    },
    ItemTemplate {
        category: "Publisher Splits",
        item_name: "Publisher splits = 100% (if publishers exist)",
        description: "If publishers are added, splits must total 100%",
        order: 5,
        required: false,
        rule: ValidationRule::AutoSplitValidated {
            entity: Entity::Work,
            split_type: RightType::Publisher,
            skip_if_empty: true,
        },
        help_text: None,
    },
    manual(
        "Legal",
        "Publishing agreements uploaded",
        "Upload signed agreements with writers and publishers",
        6,
        true,
        Some("Upload PDF contracts in the Contracts section"),
    ),
];

const LABEL_RECORDING: &[ItemTemplate] = &[
    ItemTemplate {
        category: "Recording Setup",
        item_name: "Recording entity created",
        description: "Create at least one Recording and link it to this song",
        order: 1,
        required: true,
        rule: ValidationRule::AutoEntityExists {
            entity: Entity::Recording,
        },
        help_text: None,
    },
    ItemTemplate {
        category: "Recording Setup",
        item_name: "ISRC assigned",
        description: "Recording must have an ISRC code",
        order: 2,
        required: true,
        rule: ValidationRule::AutoFieldExists {
            entity: Entity::Recording,
            field: Field::Isrc,
        },
        help_text: None,
    },
    ItemTemplate {
        category: "Audio Files",
        item_name: "Master audio uploaded",
        description: "Upload the final master audio file",
        order: 3,
        required: true,
        rule: ValidationRule::AutoFieldExists {
            entity: Entity::Recording,
            field: Field::MasterAudio,
        },
        help_text: Some("Must be WAV or FLAC, minimum 16-bit/44.1kHz"),
    },
    ItemTemplate {
        category: "Audio Files",
        item_name: "Instrumental uploaded",
        description: "Upload instrumental version (if applicable)",
        order: 4,
        required: false,
        rule: ValidationRule::AutoFieldExists {
            entity: Entity::Recording,
            field: Field::InstrumentalAudio,
        },
        help_text: None,
    },
    ItemTemplate {
        category: "Credits",
        item_name: "At least 1 credit added",
        description: "Add producer, featured artist, or other credits",
        order: 5,
        required: true,
        rule: ValidationRule::AutoCountMinimum {
            collection: Collection::RecordingCredits,
            min_count: 1,
        },
        help_text: None,
    },
    ItemTemplate {
        category: "Master Rights",
        item_name: "Master splits = 100%",
        description: "Master ownership splits must total exactly 100%",
        order: 6,
        required: true,
        rule: ValidationRule::AutoSplitValidated {
            entity: Entity::Recording,
            split_type: RightType::Master,
            skip_if_empty: false,
        },
        help_text: None,
    },
    manual(
        "Legal",
        "Production contracts uploaded",
        "Upload signed contracts with producers and featured artists",
        7,
        true,
        None,
    ),
    manual(
        "Legal",
        "Master rights cleared",
        "Confirm all master rights are cleared and owned",
        8,
        true,
        Some("Check for any samples or interpolations that need clearance"),
    ),
];

const MARKETING_ASSETS: &[ItemTemplate] = &[
    ItemTemplate {
        category: "Core Assets",
        item_name: "Cover artwork uploaded",
        description: "Upload primary cover artwork (minimum 3000x3000px)",
        order: 1,
        required: true,
        rule: ValidationRule::AutoCustom {
            function: CustomCheck::ValidateCoverArtwork,
            min_width: Some(3000),
            min_height: Some(3000),
        },
        help_text: Some("Must be JPG or PNG, RGB color mode, no watermarks"),
    },
    ItemTemplate {
        category: "Core Assets",
        item_name: "Press photo uploaded",
        description: "Upload high-res press photo of artist",
        order: 2,
        required: true,
        rule: ValidationRule::AutoFileExists {
            asset_type: AssetType::PressPhoto,
        },
        help_text: None,
    },
    manual(
        "Core Assets",
        "Marketing copy written",
        "Write press release and promotional copy",
        3,
        true,
        Some("Include song description, artist bio, release story"),
    ),
    manual(
        "Instagram",
        "Instagram feed post created",
        "Create Instagram feed post (1080x1080px)",
        10,
        true,
        Some("Square format, include cover art or artist photo"),
    ),
    manual(
        "Instagram",
        "Instagram Reel created",
        "Create Instagram Reel (9:16 vertical video, 15-90s)",
        11,
        true,
        Some("Vertical video, hook in first 3 seconds, captions"),
    ),
    manual(
        "Instagram",
        "Instagram Story graphics created",
        "Create 3-5 Instagram Story slides (1080x1920px)",
        12,
        false,
        Some("Use stickers, polls, countdown for engagement"),
    ),
    manual(
        "Facebook",
        "Facebook post graphic created",
        "Create Facebook post graphic (1200x630px)",
        20,
        true,
        Some("Landscape or square format, optimized for news feed"),
    ),
    manual(
        "Facebook",
        "Facebook Reel created",
        "Create Facebook Reel (9:16 vertical video)",
        21,
        false,
        Some("Can reuse Instagram Reel content"),
    ),
    manual(
        "YouTube",
        "YouTube video thumbnail created",
        "Create custom YouTube thumbnail (1280x720px)",
        30,
        true,
        Some("High contrast, readable text, compelling imagery"),
    ),
    manual(
        "YouTube",
        "YouTube Shorts video created",
        "Create YouTube Shorts video (9:16 vertical, <60s)",
        31,
        true,
        Some("Vertical format, fast-paced, attention-grabbing"),
    ),
    manual(
        "YouTube",
        "YouTube video description written",
        "Write YouTube video description with links and credits",
        32,
        true,
        Some("Include streaming links, social media, lyrics, credits"),
    ),
    manual(
        "TikTok",
        "TikTok video created",
        "Create TikTok promotional video (9:16 vertical, 15-60s)",
        40,
        true,
        Some("Use trending sounds, effects, and hashtags"),
    ),
    manual(
        "TikTok",
        "TikTok behind-the-scenes content",
        "Create BTS or making-of content for TikTok",
        41,
        false,
        Some("Showcase recording process, rehearsals, or artist moments"),
    ),
    manual(
        "Additional Content",
        "Lyric video created",
        "Create full lyric video (1080x1080 or 1920x1080)",
        50,
        false,
        Some("Animated lyrics synced to song"),
    ),
    manual(
        "Additional Content",
        "Visualizer video created",
        "Create audio visualizer or simple animated video",
        51,
        false,
        Some("For streaming platforms and background content"),
    ),
];

const LABEL_REVIEW: &[ItemTemplate] = &[
    ItemTemplate {
        category: "Asset Review",
        item_name: "Cover artwork approved",
        description: "Review and approve cover artwork quality and design",
        order: 1,
        required: true,
        rule: ValidationRule::AutoCustom {
            function: CustomCheck::CoverArtworkApproved,
            min_width: None,
            min_height: None,
        },
        help_text: Some("Completes when a cover_art asset is approved in asset review"),
    },
    manual(
        "Asset Review",
        "Press photo approved",
        "Review and approve press photo",
        2,
        true,
        None,
    ),
    manual(
        "Asset Review",
        "Promotional materials approved",
        "Review social media graphics and other promo materials",
        3,
        true,
        None,
    ),
    manual(
        "Technical Check",
        "All assets meet technical specs",
        "Verify dimensions, formats, color modes",
        4,
        true,
        None,
    ),
];

const READY_FOR_DIGITAL: &[ItemTemplate] = &[
    manual(
        "Release Strategy",
        "Release strategy defined",
        "Single, EP, or Album? Pre-save campaign?",
        1,
        true,
        None,
    ),
    ItemTemplate {
        category: "Release Strategy",
        item_name: "Target release date set",
        description: "Set official release date",
        order: 2,
        required: true,
        rule: ValidationRule::AutoFieldExists {
            entity: Entity::Song,
            field: Field::TargetReleaseDate,
        },
        help_text: None,
    },
    manual(
        "Release Strategy",
        "Distribution platforms selected",
        "Choose which platforms to distribute to",
        3,
        true,
        None,
    ),
];

const DIGITAL_DISTRIBUTION: &[ItemTemplate] = &[
    ItemTemplate {
        category: "Release Setup",
        item_name: "Release entity created",
        description: "Create Release in system",
        order: 1,
        required: true,
        rule: ValidationRule::AutoEntityExists {
            entity: Entity::Release,
        },
        help_text: None,
    },
    ItemTemplate {
        category: "Release Setup",
        item_name: "UPC/EAN assigned",
        description: "Assign barcode to release",
        order: 2,
        required: true,
        rule: ValidationRule::AutoFieldExists {
            entity: Entity::Release,
            field: Field::Upc,
        },
        help_text: None,
    },
    ItemTemplate {
        category: "Metadata",
        item_name: "Release metadata complete",
        description: "Title, release type and release date",
        order: 3,
        required: true,
        rule: ValidationRule::AutoCustom {
            function: CustomCheck::ValidateReleaseMetadata,
            min_width: None,
            min_height: None,
        },
        help_text: None,
    },
    manual(
        "Distribution",
        "Submitted to distributors",
        "Submit release package to distribution partners",
        4,
        true,
        None,
    ),
    ItemTemplate {
        category: "Distribution",
        item_name: "Publications created for each platform",
        description: "Create Publication entries for Spotify, Apple Music, etc.",
        order: 5,
        required: true,
        rule: ValidationRule::AutoCountMinimum {
            collection: Collection::ReleasePublications,
            min_count: 1,
        },
        help_text: None,
    },
    manual(
        "Pre-release",
        "Pre-save links generated",
        "Generate pre-save campaign links (if applicable)",
        6,
        false,
        None,
    ),
];

/// Ordered item definitions for a stage; empty for draft, released and archived
pub fn generate_checklist_for_stage(stage: Stage) -> &'static [ItemTemplate] {
    match stage {
        Stage::Draft => &[],
        Stage::Publishing => PUBLISHING,
        Stage::LabelRecording => LABEL_RECORDING,
        Stage::MarketingAssets => MARKETING_ASSETS,
        Stage::LabelReview => LABEL_REVIEW,
        Stage::ReadyForDigital => READY_FOR_DIGITAL,
        Stage::DigitalDistribution => DIGITAL_DISTRIBUTION,
        Stage::Released => &[],
        Stage::Archived => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn terminal_and_draft_stages_have_no_items() {
        assert!(generate_checklist_for_stage(Stage::Draft).is_empty());
        assert!(generate_checklist_for_stage(Stage::Released).is_empty());
        assert!(generate_checklist_for_stage(Stage::Archived).is_empty());
    }

    #[test]
    fn in_flight_stages_have_items_and_a_required_one() {
        for stage in Stage::ALL.into_iter().filter(Stage::is_in_flight) {
            let items = generate_checklist_for_stage(stage);
            assert!(!items.is_empty(), "{} has no checklist", stage);
            assert!(items.iter().any(|i| i.required), "{} has nothing required", stage);
        }
    }

    #[test]
    fn every_in_flight_stage_requires_an_auto_item() {
        let stages: Vec<Stage> = Stage::ALL.into_iter().filter(Stage::is_in_flight).collect();
        assert_eq!(stages.len(), 6);
        for stage in stages {
            assert!(
                generate_checklist_for_stage(stage)
                    .iter()
                    .any(|i| i.required && !i.rule.is_manual()),
                "{} has no required automatic item",
                stage
            );
        }
    }

    #[test]
    fn item_order_and_names_are_unique_per_stage() {
        for stage in Stage::ALL {
            let items = generate_checklist_for_stage(stage);
            let orders: HashSet<u32> = items.iter().map(|i| i.order).collect();
            let names: HashSet<&str> = items.iter().map(|i| i.item_name).collect();
            assert_eq!(orders.len(), items.len());
            assert_eq!(names.len(), items.len());
            assert!(items.windows(2).all(|w| w[0].order < w[1].order));
        }
    }

    #[test]
    fn label_review_waits_on_cover_approval() {
        let items = generate_checklist_for_stage(Stage::LabelReview);
        let cover = items
            .iter()
            .find(|i| i.item_name == "Cover artwork approved")
            .unwrap();
        assert!(cover.required);
        assert!(matches!(
            cover.rule,
            ValidationRule::AutoCustom {
                function: CustomCheck::CoverArtworkApproved,
                ..
            }
        ));
    }
}
