//! Creative Commons licence catalogue and search.
//!
//! Each licence is searched in three forms, in order: URL (exact pattern),
//! long name (literal, 10% error tolerance), short name (exact pattern).
//! The first hit in catalogue order wins.

use serde::{Deserialize, Serialize};

use super::matcher::{ExpectedWindow, FuzzyMatcher, MatchError, MatchResult, Query};

/// A licence the catalogue knows how to recognise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcLicence {
    pub short_name: &'static str,
    pub long_name: &'static str,
    pub url: &'static str,
}

pub const CC0: CcLicence = CcLicence {
    short_name: "CC0",
    long_name: "Public domain",
    url: "https://creativecommons.org/publicdomain/zero/1.0/",
};

pub const CC_BY: CcLicence = CcLicence {
    short_name: "CC BY",
    long_name: "Creative Commons Attribution",
    url: "https://creativecommons.org/licenses/by/4.0/",
};

pub const CC_BY_NC: CcLicence = CcLicence {
    short_name: "CC BY-NC",
    long_name: "Creative Commons Attribution-NonCommercial",
    url: "https://creativecommons.org/licenses/by-nc/4.0/",
};

pub const CC_BY_ND: CcLicence = CcLicence {
    short_name: "CC BY-ND",
    long_name: "Creative Commons Attribution-NoDerivatives",
    url: "https://creativecommons.org/licenses/by-nd/4.0/",
};

pub const CC_BY_SA: CcLicence = CcLicence {
    short_name: "CC BY-SA",
    long_name: "Creative Commons Attribution-ShareAlike",
    url: "https://creativecommons.org/licenses/by-sa/4.0/",
};

pub const CC_BY_NC_ND: CcLicence = CcLicence {
    short_name: "CC BY-NC-ND",
    long_name: "Creative Commons Attribution-NonCommercial-NoDerivatives",
    url: "https://creativecommons.org/licenses/by-nc-nd/4.0/",
};

pub const CC_BY_NC_SA: CcLicence = CcLicence {
    short_name: "CC BY-NC-SA",
    long_name: "Creative Commons Attribution-NonCommercial-ShareAlike",
    url: "https://creativecommons.org/licenses/by-nc-sa/4.0/",
};

pub const CC_LICENCES: &[CcLicence] = &[
    CC0,
    CC_BY,
    CC_BY_NC,
    CC_BY_ND,
    CC_BY_SA,
    CC_BY_NC_ND,
    CC_BY_NC_SA,
];

/// Which form of the licence was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenceForm {
    Url,
    LongName,
    ShortName,
}

/// A licence statement located in the text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenceMatch {
    pub licence: String,
    pub form: LicenceForm,
    #[serde(rename = "match")]
    pub found: MatchResult,
}

impl CcLicence {
    fn forms(&self) -> [(LicenceForm, Query<'static>, f64); 3] {
        [
            (LicenceForm::Url, Query::Pattern(self.url), 0.0),
            (LicenceForm::LongName, Query::Literal(self.long_name), 0.1),
            (LicenceForm::ShortName, Query::Pattern(self.short_name), 0.0),
        ]
    }
}

/// Walk `catalogue` and return the first licence found, or `None` when the
/// catalogue is exhausted without evidence.
pub fn find_licence(
    matcher: &FuzzyMatcher,
    catalogue: &[CcLicence],
) -> Result<Option<LicenceMatch>, MatchError> {
    for licence in catalogue {
        for (form, query, ratio) in licence.forms() {
            if let Some(found) = matcher.search(query, ratio, ExpectedWindow::default())? {
                return Ok(Some(LicenceMatch {
                    licence: licence.short_name.to_string(),
                    form,
                    found,
                }));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_url_form() {
        let matcher = FuzzyMatcher::new(
            "This article is licensed under https://creativecommons.org/licenses/by/4.0/ terms.",
        );
        let found = find_licence(&matcher, CC_LICENCES).unwrap().unwrap();
        assert_eq!(found.licence, "CC BY");
        assert_eq!(found.form, LicenceForm::Url);
    }

    #[test]
    fn test_finds_long_name_with_typo() {
        let matcher = FuzzyMatcher::new("Distributed under a Creative Comons Atribution licence.");
        let found = find_licence(&matcher, CC_LICENCES).unwrap().unwrap();
        assert_eq!(found.licence, "CC BY");
        assert_eq!(found.form, LicenceForm::LongName);
    }

    #[test]
    fn test_finds_short_name() {
        let matcher = FuzzyMatcher::new("Open access under a CC BY-NC-ND licence");
        let found = find_licence(&matcher, CC_LICENCES).unwrap().unwrap();
        // Catalogue order: the shorter "CC BY" is tried first and is a prefix
        assert_eq!(found.licence, "CC BY");
        assert_eq!(found.form, LicenceForm::ShortName);
    }

    #[test]
    fn test_exhausted_catalogue() {
        let matcher = FuzzyMatcher::new("© 2019 Elsevier Ltd. All rights reserved.");
        assert!(find_licence(&matcher, CC_LICENCES).unwrap().is_none());
    }
}
