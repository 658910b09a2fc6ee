use std::convert::Infallible;

use axum::extract::{FromRequestParts, Query};
use axum::http::{HeaderMap, Uri};
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Id,
}

impl Locale {
    pub const SUPPORTED: [Locale; 2] = [Locale::En, Locale::Id];

    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Id => "id",
        }
    }

    /// Exact match on a supported locale code.
    pub fn from_code(code: &str) -> Option<Locale> {
        Self::SUPPORTED
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(code.trim()))
    }

    pub fn t(self, msg: Message) -> &'static str {
        match self {
            Locale::En => msg.en(),
            Locale::Id => msg.id(),
        }
    }

    /// Translate and substitute `:name` placeholders.
    pub fn format(self, msg: Message, params: &[(&str, &str)]) -> String {
        let mut out = self.t(msg).to_string();
        for (key, value) in params {
            out = out.replace(&format!(":{key}"), value);
        }
        out
    }
}

#[derive(Deserialize)]
struct LocaleQuery {
    locale: Option<String>,
}

/// Resolve the request locale: `Accept-Language`, then `X-Locale`, then the
/// `locale` query parameter, then the user's stored preference, then English.
pub fn negotiate(
    accept_language: Option<&str>,
    x_locale: Option<&str>,
    param: Option<&str>,
    user_pref: Option<&str>,
) -> Locale {
    accept_language
        .and_then(parse_accept_language)
        .or_else(|| x_locale.and_then(Locale::from_code))
        .or_else(|| param.and_then(Locale::from_code))
        .or_else(|| user_pref.and_then(Locale::from_code))
        .unwrap_or_default()
}

/// Best supported match from an `Accept-Language` header, honouring q-values.
/// Tries the full tag first, then its primary subtag (`en` from `en-US`).
pub fn parse_accept_language(header: &str) -> Option<Locale> {
    let mut ranked: Vec<(&str, f32)> = header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let tag = pieces.next()?.trim();
            if tag.is_empty() {
                return None;
            }
            let quality = pieces
                .next()
                .and_then(|q| q.trim().strip_prefix("q="))
                .map(|q| q.trim().parse::<f32>().unwrap_or(0.0))
                .unwrap_or(1.0);
            Some((tag, quality))
        })
        .filter(|(_, q)| *q > 0.0)
        .collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    ranked.into_iter().find_map(|(tag, _)| {
        Locale::from_code(tag).or_else(|| {
            tag.split('-')
                .next()
                .and_then(Locale::from_code)
        })
    })
}

/// Negotiate from request headers and query string, with an optional stored user preference.
pub fn from_request(headers: &HeaderMap, uri: &Uri, user_pref: Option<&str>) -> Locale {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let param = Query::<LocaleQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.locale);

    negotiate(
        header("accept-language"),
        header("x-locale"),
        param.as_deref(),
        user_pref,
    )
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(from_request(&parts.headers, &parts.uri, None))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    // Auth
    AuthFailed,
    AuthThrottle,
    LoginSuccess,
    LogoutSuccess,
    Unauthenticated,
    TokenInvalid,
    TokenExpired,
    ProfileUpdated,
    PasswordChanged,
    OldPasswordIncorrect,
    ResetLinkSent,
    PasswordResetDone,
    ResetTokenInvalid,
    UserRetrieved,
    // Users
    UserCreated,
    UserUpdated,
    UserDeleted,
    UserNotFound,
    UsersRetrieved,
    CannotDeleteSelf,
    CannotDeleteSuperAdmin,
    CannotEditSuperAdmin,
    CannotAssignSuperAdmin,
    // Roles
    RoleCreated,
    RoleUpdated,
    RoleDeleted,
    RoleNotFound,
    RolesRetrieved,
    RoleRetrieved,
    CannotDeleteSystemRole,
    CannotEditSuperAdminRole,
    CannotRenameSystemRole,
    // Permissions
    PermissionsRetrieved,
    PermissionsGroupedRetrieved,
    // Dashboard
    StatsRetrieved,
    // Avatar
    AvatarUploaded,
    AvatarDeleted,
    AvatarNotFound,
    AvatarRetrieved,
    // Validation
    ValidationFailed,
    Required,
    Email,
    Unique,
    Min,
    Max,
    Confirmed,
    Exists,
    In,
    Image,
    FileMax,
    // General
    Forbidden,
    ApiEndpointNotFound,
}

impl Message {
    fn en(self) -> &'static str {
        use Message::*;
        match self {
            AuthFailed => "These credentials do not match our records.",
            AuthThrottle => "Too many login attempts. Please try again in :seconds seconds.",
            LoginSuccess => "Login successful",
            LogoutSuccess => "Logout successful",
            Unauthenticated => "You are not authorized to access this resource",
            TokenInvalid => "Token is invalid",
            TokenExpired => "Token has expired",
            ProfileUpdated => "Profile updated successfully",
            PasswordChanged => "Password changed successfully",
            OldPasswordIncorrect => "Current password is incorrect",
            ResetLinkSent => "If that email is registered, a password reset link has been sent.",
            PasswordResetDone => "Password reset successfully",
            ResetTokenInvalid => "Invalid or expired reset token",
            UserRetrieved => "User retrieved successfully",
            UserCreated => "User created successfully",
            UserUpdated => "User updated successfully",
            UserDeleted => "User deleted successfully",
            UserNotFound => "User not found",
            UsersRetrieved => "Users retrieved successfully",
            CannotDeleteSelf => "You cannot delete your own account",
            CannotDeleteSuperAdmin => "Super Admin cannot be deleted",
            CannotEditSuperAdmin => "Cannot edit Super Admin account",
            CannotAssignSuperAdmin => "Only a Super Admin can assign the Super Admin role",
            RoleCreated => "Role created successfully",
            RoleUpdated => "Role updated successfully",
            RoleDeleted => "Role deleted successfully",
            RoleNotFound => "Role not found",
            RolesRetrieved => "Roles retrieved successfully",
            RoleRetrieved => "Role retrieved successfully",
            CannotDeleteSystemRole => "System roles cannot be deleted",
            CannotEditSuperAdminRole => "Cannot edit Super Admin role",
            CannotRenameSystemRole => "System roles cannot be renamed",
            PermissionsRetrieved => "Permissions retrieved successfully",
            PermissionsGroupedRetrieved => "Grouped permissions retrieved successfully",
            StatsRetrieved => "Dashboard statistics retrieved successfully",
            AvatarUploaded => "Avatar uploaded successfully",
            AvatarDeleted => "Avatar deleted successfully",
            AvatarNotFound => "No avatar found",
            AvatarRetrieved => "Avatar retrieved successfully",
            ValidationFailed => "Validation failed",
            Required => "The :attribute field is required",
            Email => "The :attribute must be a valid email address",
            Unique => "The :attribute has already been taken",
            Min => "The :attribute must be at least :min characters",
            Max => "The :attribute must not be greater than :max characters",
            Confirmed => "The :attribute confirmation does not match",
            Exists => "The selected :attribute is invalid",
            In => "The selected :attribute is invalid",
            Image => "The :attribute must be a file of type: :values",
            FileMax => "The :attribute must not be greater than :max kilobytes",
            Forbidden => "You do not have permission to perform this action",
            ApiEndpointNotFound => "API endpoint not found",
        }
    }

    fn id(self) -> &'static str {
        use Message::*;
        match self {
            AuthFailed => "Kredensial ini tidak cocok dengan catatan kami.",
            AuthThrottle => "Terlalu banyak percobaan login. Silakan coba lagi dalam :seconds detik.",
            LoginSuccess => "Login berhasil",
            LogoutSuccess => "Logout berhasil",
            Unauthenticated => "Anda tidak memiliki akses ke sumber daya ini",
            TokenInvalid => "Token tidak valid",
            TokenExpired => "Token telah kedaluwarsa",
            ProfileUpdated => "Profil berhasil diperbarui",
            PasswordChanged => "Kata sandi berhasil diubah",
            OldPasswordIncorrect => "Kata sandi saat ini salah",
            ResetLinkSent => "Jika email tersebut terdaftar, tautan atur ulang kata sandi telah dikirim.",
            PasswordResetDone => "Kata sandi berhasil diatur ulang",
            ResetTokenInvalid => "Token atur ulang tidak valid atau telah kedaluwarsa",
            UserRetrieved => "Data pengguna berhasil diambil",
            UserCreated => "Pengguna berhasil dibuat",
            UserUpdated => "Pengguna berhasil diperbarui",
            UserDeleted => "Pengguna berhasil dihapus",
            UserNotFound => "Pengguna tidak ditemukan",
            UsersRetrieved => "Data pengguna berhasil diambil",
            CannotDeleteSelf => "Anda tidak dapat menghapus akun sendiri",
            CannotDeleteSuperAdmin => "Super Admin tidak dapat dihapus",
            CannotEditSuperAdmin => "Akun Super Admin tidak dapat diubah",
            CannotAssignSuperAdmin => "Hanya Super Admin yang dapat memberikan peran Super Admin",
            RoleCreated => "Peran berhasil dibuat",
            RoleUpdated => "Peran berhasil diperbarui",
            RoleDeleted => "Peran berhasil dihapus",
            RoleNotFound => "Peran tidak ditemukan",
            RolesRetrieved => "Data peran berhasil diambil",
            RoleRetrieved => "Data peran berhasil diambil",
            CannotDeleteSystemRole => "Peran sistem tidak dapat dihapus",
            CannotEditSuperAdminRole => "Peran Super Admin tidak dapat diubah",
            CannotRenameSystemRole => "Peran sistem tidak dapat diganti namanya",
            PermissionsRetrieved => "Data izin berhasil diambil",
            PermissionsGroupedRetrieved => "Data izin berhasil diambil berdasarkan grup",
            StatsRetrieved => "Statistik dashboard berhasil diambil",
            AvatarUploaded => "Avatar berhasil diunggah",
            AvatarDeleted => "Avatar berhasil dihapus",
            AvatarNotFound => "Avatar tidak ditemukan",
            AvatarRetrieved => "Avatar berhasil diambil",
            ValidationFailed => "Validasi gagal",
            Required => "Kolom :attribute wajib diisi",
            Email => ":attribute harus berupa alamat email yang valid",
            Unique => ":attribute sudah digunakan",
            Min => ":attribute minimal harus :min karakter",
            Max => ":attribute tidak boleh lebih dari :max karakter",
            Confirmed => "Konfirmasi :attribute tidak cocok",
            Exists => ":attribute yang dipilih tidak valid",
            In => ":attribute yang dipilih tidak valid",
            Image => ":attribute harus berupa berkas bertipe: :values",
            FileMax => ":attribute tidak boleh lebih dari :max kilobyte",
            Forbidden => "Anda tidak memiliki izin untuk melakukan tindakan ini",
            ApiEndpointNotFound => "Endpoint API tidak ditemukan",
        }
    }
}
