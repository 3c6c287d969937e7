use serde::{Deserialize, Serialize};

/// Destination of an outbound share message.
///
/// Discriminants match the platform SDK's scene constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShareScene {
    /// Chat with a friend or group
    #[default]
    Session = 0,
    /// Moments feed
    Timeline = 1,
    /// Favorites
    Favorite = 2,
    /// Status
    Status = 3,
    /// A specified contact
    #[serde(alias = "contact")]
    SpecifiedContact = 4,
}

impl ShareScene {
    /// Lenient parse of the bridge's scene names; unknown names fall back to
    /// [`ShareScene::Session`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "timeline" => Self::Timeline,
            "favorite" => Self::Favorite,
            "status" => Self::Status,
            "specifiedContact" | "contact" => Self::SpecifiedContact,
            _ => Self::Session,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Mini program build flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MiniProgramType {
    #[default]
    Release = 0,
    Test = 1,
    Preview = 2,
}

impl MiniProgramType {
    /// Unknown names fall back to [`MiniProgramType::Release`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "test" => Self::Test,
            "preview" => Self::Preview,
            _ => Self::Release,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Serde helpers that map unknown bridge names to the defaults instead of failing
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};

    use super::{MiniProgramType, ShareScene};

    pub(crate) fn scene<'de, D: Deserializer<'de>>(d: D) -> Result<ShareScene, D::Error> {
        Ok(Option::<String>::deserialize(d)?
            .map(|name| ShareScene::from_name(&name))
            .unwrap_or_default())
    }

    pub(crate) fn program_type<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<MiniProgramType, D::Error> {
        Ok(Option::<String>::deserialize(d)?
            .map(|name| MiniProgramType::from_name(&name))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_scene_from_name() {
        assert_eq!(ShareScene::from_name("session"), ShareScene::Session);
        assert_eq!(ShareScene::from_name("timeline"), ShareScene::Timeline);
        assert_eq!(ShareScene::from_name("favorite"), ShareScene::Favorite);
        assert_eq!(ShareScene::from_name("status"), ShareScene::Status);
        assert_eq!(ShareScene::from_name("contact"), ShareScene::SpecifiedContact);
        assert_eq!(
            ShareScene::from_name("specifiedContact"),
            ShareScene::SpecifiedContact
        );
        assert_eq!(ShareScene::from_name("nowhere"), ShareScene::Session);
    }

    #[test]
    fn test_share_scene_wire_values() {
        assert_eq!(ShareScene::Session.as_i32(), 0);
        assert_eq!(ShareScene::Timeline.as_i32(), 1);
        assert_eq!(ShareScene::SpecifiedContact.as_i32(), 4);
    }

    #[test]
    fn test_share_scene_serde_names() {
        let scene: ShareScene = serde_json::from_str("\"specifiedContact\"").unwrap();
        assert_eq!(scene, ShareScene::SpecifiedContact);
        let scene: ShareScene = serde_json::from_str("\"contact\"").unwrap();
        assert_eq!(scene, ShareScene::SpecifiedContact);
        assert_eq!(
            serde_json::to_string(&ShareScene::Timeline).unwrap(),
            "\"timeline\""
        );
    }

    #[test]
    fn test_mini_program_type_from_name() {
        assert_eq!(MiniProgramType::from_name("release"), MiniProgramType::Release);
        assert_eq!(MiniProgramType::from_name("test"), MiniProgramType::Test);
        assert_eq!(MiniProgramType::from_name("preview"), MiniProgramType::Preview);
        assert_eq!(MiniProgramType::from_name("beta"), MiniProgramType::Release);
        assert_eq!(MiniProgramType::Preview.as_i32(), 2);
    }
}
