//! Bounded, ordered collections for the per-user photo and hobby sets.
//!
//! Storage and the public JSON keep the legacy numbered layout
//! (`photo1`..`photo5`, `hobby1`..`hobby5`); everything in between works with
//! an ordered sequence of at most [`MAX_SLOTS`] items.

use serde::{Deserialize, Serialize};

pub const MAX_SLOTS: usize = 5;
pub const MAX_PHOTO_REF_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("at most {MAX_SLOTS} items are allowed, got {0}")]
    TooMany(usize),
    #[error("at least one photo is required")]
    MissingFirst,
    #[error("photo reference must be 1-{MAX_PHOTO_REF_LEN} characters")]
    InvalidPhotoRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Slots<T>(Vec<T>);

impl<T> Slots<T> {
    pub fn new(items: Vec<T>) -> Result<Self, SlotError> {
        if items.len() > MAX_SLOTS {
            return Err(SlotError::TooMany(items.len()));
        }
        Ok(Self(items))
    }

    /// Collapse numbered slots into a sequence, skipping empty ones.
    pub fn from_numbered(slots: [Option<T>; MAX_SLOTS]) -> Self {
        Self(slots.into_iter().flatten().collect())
    }

    pub fn into_numbered(self) -> [Option<T>; MAX_SLOTS] {
        let mut items = self.0.into_iter();
        std::array::from_fn(|_| items.next())
    }

    pub fn first(&self) -> Option<&T> {
        self.0.first()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }
}

// --- PhotoSet ---

/// One to five photo references; the first is the primary photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NumberedPhotos", into = "NumberedPhotos")]
pub struct PhotoSet(Slots<String>);

impl PhotoSet {
    pub fn new(photos: Vec<String>) -> Result<Self, SlotError> {
        if photos.is_empty() {
            return Err(SlotError::MissingFirst);
        }
        if photos.iter().any(|p| p.trim().is_empty() || p.len() > MAX_PHOTO_REF_LEN) {
            return Err(SlotError::InvalidPhotoRef);
        }
        Ok(Self(Slots::new(photos)?))
    }

    pub fn primary(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn photos(&self) -> &[String] {
        self.0.as_slice()
    }

    pub fn into_numbered(self) -> [Option<String>; MAX_SLOTS] {
        self.0.into_numbered()
    }

    pub(crate) fn from_numbered(slots: [Option<String>; MAX_SLOTS]) -> Self {
        Self(Slots::from_numbered(slots))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NumberedPhotos {
    photo1: String,
    #[serde(default)]
    photo2: Option<String>,
    #[serde(default)]
    photo3: Option<String>,
    #[serde(default)]
    photo4: Option<String>,
    #[serde(default)]
    photo5: Option<String>,
}

impl TryFrom<NumberedPhotos> for PhotoSet {
    type Error = SlotError;

    fn try_from(w: NumberedPhotos) -> Result<Self, Self::Error> {
        let photos = [Some(w.photo1), w.photo2, w.photo3, w.photo4, w.photo5];
        PhotoSet::new(photos.into_iter().flatten().collect())
    }
}

impl From<PhotoSet> for NumberedPhotos {
    fn from(set: PhotoSet) -> Self {
        let [p1, photo2, photo3, photo4, photo5] = set.into_numbered();
        Self {
            photo1: p1.unwrap_or_default(),
            photo2,
            photo3,
            photo4,
            photo5,
        }
    }
}

// --- HobbySet ---

/// Up to five hobby category codes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "NumberedHobbies", into = "NumberedHobbies")]
pub struct HobbySet(Slots<i32>);

impl HobbySet {
    pub fn new(hobbies: Vec<i32>) -> Result<Self, SlotError> {
        Ok(Self(Slots::new(hobbies)?))
    }

    pub fn codes(&self) -> &[i32] {
        self.0.as_slice()
    }

    pub fn into_numbered(self) -> [Option<i32>; MAX_SLOTS] {
        self.0.into_numbered()
    }

    pub(crate) fn from_numbered(slots: [Option<i32>; MAX_SLOTS]) -> Self {
        Self(Slots::from_numbered(slots))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NumberedHobbies {
    #[serde(default)]
    hobby1: Option<i32>,
    #[serde(default)]
    hobby2: Option<i32>,
    #[serde(default)]
    hobby3: Option<i32>,
    #[serde(default)]
    hobby4: Option<i32>,
    #[serde(default)]
    hobby5: Option<i32>,
}

impl TryFrom<NumberedHobbies> for HobbySet {
    type Error = SlotError;

    fn try_from(w: NumberedHobbies) -> Result<Self, Self::Error> {
        let hobbies = [w.hobby1, w.hobby2, w.hobby3, w.hobby4, w.hobby5];
        HobbySet::new(hobbies.into_iter().flatten().collect())
    }
}

impl From<HobbySet> for NumberedHobbies {
    fn from(set: HobbySet) -> Self {
        let [hobby1, hobby2, hobby3, hobby4, hobby5] = set.into_numbered();
        Self { hobby1, hobby2, hobby3, hobby4, hobby5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slots_cap_at_five() {
        assert!(Slots::new(vec![1, 2, 3, 4, 5]).is_ok());
        assert_eq!(Slots::new(vec![1, 2, 3, 4, 5, 6]), Err(SlotError::TooMany(6)));
    }

    #[test]
    fn numbered_gaps_are_compacted_in_order() {
        let slots = Slots::from_numbered([Some(1), None, Some(3), None, Some(5)]);
        assert_eq!(slots.as_slice(), &[1, 3, 5]);
        assert_eq!(slots.into_numbered(), [Some(1), Some(3), Some(5), None, None]);
    }

    #[test]
    fn photo_set_wire_format() {
        let set: PhotoSet = serde_json::from_value(json!({
            "photo1": "a.jpg",
            "photo3": "c.jpg",
        }))
        .unwrap();
        assert_eq!(set.photos(), &["a.jpg".to_string(), "c.jpg".to_string()]);
        assert_eq!(set.primary(), "a.jpg");

        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["photo1"], "a.jpg");
        assert_eq!(value["photo2"], "c.jpg");
        assert!(value["photo5"].is_null());
    }

    #[test]
    fn photo_set_requires_first_photo() {
        assert!(serde_json::from_value::<PhotoSet>(json!({ "photo2": "b.jpg" })).is_err());
        assert!(serde_json::from_value::<PhotoSet>(json!({ "photo1": "  " })).is_err());
        assert_eq!(PhotoSet::new(vec![]), Err(SlotError::MissingFirst));
    }

    #[test]
    fn hobby_set_may_be_empty() {
        let set: HobbySet = serde_json::from_value(json!({})).unwrap();
        assert!(set.codes().is_empty());

        let set: HobbySet = serde_json::from_value(json!({ "hobby2": 7, "hobby5": 3 })).unwrap();
        assert_eq!(set.codes(), &[7, 3]);
    }
}
