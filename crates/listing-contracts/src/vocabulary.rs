//! Closed attribute vocabularies used to constrain generated listings.

#[rustfmt::skip]
pub const COLORS: &[&str] = &[
    "Beige", "Black", "Blue", "Bronze", "Brown", "Clear", "Copper", "Gold", "Gray", "Green",
    "Orange", "Pink", "Purple", "Rainbow", "Red", "Rose gold", "Silver", "White", "Yellow",
];

#[rustfmt::skip]
pub const FABRICS: &[&str] = &[
    "Alligator leather", "Alpaca", "Angora", "Artificial silk", "Barkcloth", "Batiste",
    "Batting", "Bison leather", "Bouclé", "Broadcloth", "Brocade", "Buckram", "Burlap",
    "Cable knit", "Calf leather", "Cambric", "Camel hair", "Canvas", "Cashmere", "Challis",
    "Chambray", "Chanderi", "Charmeuse", "Cheesecloth", "Chenille", "Chiengora", "Chiffon",
    "Chino", "Chintz", "Corduroy", "Cork", "Cotton", "Cowhide", "Crepe", "Crepe back satin",
    "Crepe de chine", "Crinoline", "Damask", "Deer leather", "Denim", "Dobby", "Dola silk",
    "Double face", "Double knit", "Eyelet", "Faille", "Faux fur", "Faux leather", "Felt",
    "Flannel", "Fleece", "Fur", "Gabardine", "Gauze", "Gazar", "Georgette", "Gingham",
    "Goat leather", "Grasscloth", "Guanaco", "Herringbone", "Horse leather", "Houndstooth",
    "Interlock knit", "Jacquard", "Jersey knit", "Kente", "Khadi", "Lace", "Lambswool",
    "Lame & metallic", "Leather", "Linen", "Llama", "Madras", "Matelassé", "Merino", "Mesh",
    "Microfiber", "Minky", "Moiré", "Moleskin", "Muga silk", "Muslin", "Mysore silk",
    "Neoprene", "Netting", "Oilcloth", "Organdy", "Organza", "Ostrich leather", "Pashmina",
    "Percale", "Pig leather", "Pique", "Pongee", "Qiviut", "Rabbit", "Raschel", "Rib knit",
    "Ripstop", "Sari silk", "Sateen", "Satin", "Scrim", "Seersucker", "Sequins",
    "Shantung & dupioni", "Sheep leather", "Sheepskin", "Sherpa", "Silk", "Snake leather",
    "Spandex", "Suede", "Suri", "Taffeta", "Terry cloth", "Thermal knit", "Tricot", "Tulle",
    "Tussar silk", "Tweed", "Twil", "Ultrasuede", "Velour", "Velvet", "Velveteen", "Vicuna",
    "Vinyl", "Voile", "Wool", "Yak",
];

#[rustfmt::skip]
pub const OCCASIONS: &[&str] = &[
    "1st birthday", "Anniversary", "Baby shower", "Bachelor party", "Bachelorette party",
    "Back to school", "Baptism", "Bar & Bat Mitzvah", "Birthday", "Bridal shower",
    "Confirmation", "Divorce & breakup", "Engagement", "First Communion", "Graduation",
    "Grief & mourning", "Housewarming", "LGBTQ pride", "Moving", "Pet loss", "Prom",
    "Quinceañera & Sweet 16", "Retirement", "Wedding",
];

#[rustfmt::skip]
pub const HOLIDAYS: &[&str] = &[
    "April Fools'", "Christmas", "Cinco de Mayo", "Easter", "Father's Day", "Halloween",
    "Hanukkah", "Independence Day", "Kwanzaa", "Lunar New Year", "Mother's Day", "New Year's",
    "Passover", "St Patrick's Day", "Thanksgiving", "Valentine's Day",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocabulary {
    Color,
    Fabric,
    Occasion,
    Holiday,
}

impl Vocabulary {
    pub fn values(self) -> &'static [&'static str] {
        match self {
            Self::Color => COLORS,
            Self::Fabric => FABRICS,
            Self::Occasion => OCCASIONS,
            Self::Holiday => HOLIDAYS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Fabric => "fabric",
            Self::Occasion => "occasion",
            Self::Holiday => "holiday",
        }
    }

    /// Exact-match membership. The empty string means "no fit" and is always allowed.
    pub fn contains(self, value: &str) -> bool {
        value.is_empty() || self.values().iter().any(|item| *item == value)
    }

    pub fn joined(self) -> String {
        self.values().join(", ")
    }
}
