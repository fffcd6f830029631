// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use heck::{ToLowerCamelCase, ToUpperCamelCase};

/// A type name with the plural forms used in root field names.
pub trait ToPlural {
    /// `Movie` -> `movies`
    fn to_plural(&self) -> String;
    /// `Movie` -> `Movies` (as in `createMovies`)
    fn to_upper_plural(&self) -> String;
}

impl ToPlural for str {
    fn to_plural(&self) -> String {
        let plural_name = pluralizer::pluralize(self, 2, false);
        let plural_name = if plural_name == self {
            // Force pluralization if the pluralizer returns the same string
            format!("{self}s")
        } else {
            plural_name
        };
        plural_name.to_lower_camel_case()
    }

    fn to_upper_plural(&self) -> String {
        self.to_plural().to_upper_camel_case()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plural_names() {
        assert_eq!("movies", "Movie".to_plural());
        assert_eq!("Movies", "Movie".to_upper_plural());
        assert_eq!("people", "Person".to_plural());
        assert_eq!("productionCompanies", "ProductionCompany".to_plural());
        assert_eq!("ProductionCompanies", "ProductionCompany".to_upper_plural());
    }
}
