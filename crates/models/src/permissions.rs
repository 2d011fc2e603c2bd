//! Fine-grained control over actions a user can take.

use bitflags::bitflags;
use failure::Fail;
use serde::{de, ser::{self, SerializeSeq}};
use std::fmt;
use syllabus_error::ApiError;

bitflags! {
    /// Permissions allow for a fine-grained control over what actions a given
    /// user can take.
    pub struct PermissionBits: i32 {
        /// All bits allocated for course management permissions.
        const MANAGE_COURSES_BITS = 0x0000_000f;
        /// Permission holder can list their own courses.
        const VIEW_COURSE = 0x0000_0001;
        /// Permission holder can create new courses.
        const ADD_COURSE = 0x0000_0002;
        /// Permission holder can change courses they own.
        const EDIT_COURSE = 0x0000_0004;
        /// Permission holder can delete courses they own.
        const DELETE_COURSE = 0x0000_0008;
        /// Permission holder can create subjects.
        const MANAGE_SUBJECTS = 0x0000_0010;
    }
}

/// Names of all single permissions, in order of their bits.
const NAMES: &[(PermissionBits, &str)] = &[
    (PermissionBits::VIEW_COURSE, "course:view"),
    (PermissionBits::ADD_COURSE, "course:add"),
    (PermissionBits::EDIT_COURSE, "course:edit"),
    (PermissionBits::DELETE_COURSE, "course:delete"),
    (PermissionBits::MANAGE_SUBJECTS, "subject:manage"),
];

impl PermissionBits {
    /// Permissions of an instructor: everything needed to manage their own
    /// courses.
    pub fn instructor() -> PermissionBits {
        PermissionBits::MANAGE_COURSES_BITS
    }

    /// Look up a single permission by its name.
    pub fn from_name(name: &str) -> Option<PermissionBits> {
        NAMES.iter()
            .find(|(_, n)| *n == name)
            .map(|&(bits, _)| bits)
    }

    /// Iterate over names of all permissions in this set.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        NAMES.iter()
            .filter(move |(bits, _)| self.contains(*bits))
            .map(|&(_, name)| name)
    }

    /// Verify that all required permissions are present.
    ///
    /// This is the same check as `self.contains(permissions)`, but returns an
    /// [`ApiError`].
    pub fn require(self, permissions: PermissionBits)
    -> Result<(), RequirePermissionsError> {
        if self.contains(permissions) {
            Ok(())
        } else {
            log::trace!("Missing permissions: {:?}", permissions - self);
            Err(RequirePermissionsError(permissions - self))
        }
    }
}

impl fmt::Display for PermissionBits {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;

        for name in self.names() {
            if !first {
                fmt.write_str(", ")?;
            }
            first = false;
            fmt.write_str(name)?;
        }

        Ok(())
    }
}

#[derive(ApiError, Debug, Fail)]
#[api(status = "FORBIDDEN", code = "user:insufficient-permissions")]
#[fail(display = "Missing required permissions: {}", _0)]
pub struct RequirePermissionsError(pub PermissionBits);

pub trait Permission {
    /// Permissions are stored as bit-flags, and this field is a mask of bits
    /// corresponding to this permission (or combination of permissions).
    fn bits() -> PermissionBits;
}

macro_rules! permission {
    (
        $name:ident = $value:ident
    ) => {
        pub struct $name;

        impl Permission for $name {
            #[inline]
            fn bits() -> PermissionBits {
                PermissionBits::$value
            }
        }
    };
}

permission!(ViewCourse = VIEW_COURSE);
permission!(AddCourse = ADD_COURSE);
permission!(EditCourse = EDIT_COURSE);
permission!(DeleteCourse = DELETE_COURSE);
permission!(ManageSubjects = MANAGE_SUBJECTS);

/// No permissions are required, only a session.
impl Permission for () {
    #[inline]
    fn bits() -> PermissionBits {
        PermissionBits::empty()
    }
}

macro_rules! impl_permissons {
    {
        $( ($($name:ident),+) );+ $(;)*
    } => {
        $(
            impl<$($name),+> Permission for ($($name),+)
            where
                $($name: Permission,)+
            {
                #[inline]
                fn bits() -> PermissionBits {
                    $($name::bits())|+
                }
            }
        )+
    };
}

impl_permissons! {
    (A, B);
    (A, B, C);
}

impl ser::Serialize for PermissionBits {
    fn serialize<S>(&self, ser: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        if !ser.is_human_readable() {
            return ser.serialize_i32(self.bits());
        }

        let mut seq = ser.serialize_seq(Some(self.bits().count_ones() as usize))?;
        for name in self.names() {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

impl<'de> de::Deserialize<'de> for PermissionBits {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        if !de.is_human_readable() {
            de.deserialize_i32(BitsVisitor)
        } else {
            de.deserialize_any(BitsVisitor)
        }
    }
}

struct BitsVisitor;

impl<'de> de::Visitor<'de> for BitsVisitor {
    type Value = PermissionBits;

    fn expecting(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "a set of permissions")
    }

    fn visit_i64<E>(self, v: i64) -> Result<PermissionBits, E>
    where
        E: de::Error,
    {
        if v < std::i32::MIN.into() || v > std::i32::MAX.into() {
            return Err(E::invalid_type(
                de::Unexpected::Signed(v), &"a 32-bit integer"));
        }

        PermissionBits::from_bits(v as i32)
            .ok_or_else(|| E::invalid_value(
                de::Unexpected::Signed(v), &"a bit-flag of permissions"))
    }

    fn visit_u64<E>(self, v: u64) -> Result<PermissionBits, E>
    where
        E: de::Error,
    {
        if v > std::i32::MAX as u64 {
            return Err(E::invalid_type(
                de::Unexpected::Unsigned(v), &"a 32-bit integer"));
        }

        self.visit_i64(v as i64)
    }

    fn visit_str<E>(self, v: &str) -> Result<PermissionBits, E>
    where
        E: de::Error,
    {
        PermissionBits::from_name(v)
            .ok_or_else(|| E::invalid_value(
                de::Unexpected::Str(v), &"a permission name"))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<PermissionBits, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut bits = PermissionBits::empty();

        while let Some(permission) = seq.next_element::<PermissionBits>()? {
            bits.insert(permission);
        }

        Ok(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syllabus_error::StatusCode;

    #[test]
    fn names_round_trip() {
        for &(bits, name) in NAMES {
            assert_eq!(PermissionBits::from_name(name), Some(bits));
        }
        assert_eq!(PermissionBits::from_name("course:fly"), None);
    }

    #[test]
    fn require_reports_missing_bits() {
        let held = PermissionBits::VIEW_COURSE | PermissionBits::ADD_COURSE;

        assert!(held.require(PermissionBits::ADD_COURSE).is_ok());
        assert!(held.require(PermissionBits::empty()).is_ok());

        let err = held
            .require(PermissionBits::ADD_COURSE | PermissionBits::DELETE_COURSE)
            .unwrap_err();
        assert_eq!(err.0, PermissionBits::DELETE_COURSE);
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.code().as_ref().map(|c| &**c),
            Some("user:insufficient-permissions"));
        assert_eq!(err.to_string(), "Missing required permissions: course:delete");
    }

    #[test]
    fn combined_permissions() {
        assert_eq!(
            <(EditCourse, DeleteCourse)>::bits(),
            PermissionBits::EDIT_COURSE | PermissionBits::DELETE_COURSE,
        );
        assert_eq!(<()>::bits(), PermissionBits::empty());
    }

    #[test]
    fn serialize_as_names() {
        let bits = PermissionBits::VIEW_COURSE | PermissionBits::MANAGE_SUBJECTS;
        assert_eq!(
            serde_json::to_string(&bits).unwrap(),
            r#"["course:view","subject:manage"]"#,
        );
    }

    #[test]
    fn deserialize_names_and_bits() {
        let bits: PermissionBits =
            serde_json::from_str(r#"["course:add", "course:edit"]"#).unwrap();
        assert_eq!(bits, PermissionBits::ADD_COURSE | PermissionBits::EDIT_COURSE);

        let bits: PermissionBits = serde_json::from_str("3").unwrap();
        assert_eq!(bits, PermissionBits::VIEW_COURSE | PermissionBits::ADD_COURSE);

        assert!(serde_json::from_str::<PermissionBits>(r#"["nope"]"#).is_err());
        assert!(serde_json::from_str::<PermissionBits>("1024").is_err());
    }

    #[test]
    fn instructor_can_manage_courses_but_not_subjects() {
        let bits = PermissionBits::instructor();
        assert!(bits.contains(PermissionBits::ADD_COURSE | PermissionBits::DELETE_COURSE));
        assert!(!bits.contains(PermissionBits::MANAGE_SUBJECTS));
    }
}
