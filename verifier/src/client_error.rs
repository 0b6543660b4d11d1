// Copyright (c) 2023 The NemID Verifier Developers

//! Error codes the NemID client sends instead of a signed response.
//!
//! See the NemID service provider documentation for the full list of codes.

use core::fmt::{Display, Formatter};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

const TECHNICAL_ERROR_EN: &str =
    "A technical error has occurred. Contact the service provider if the problem persists.";
const TECHNICAL_ERROR_DA: &str =
    "Der er opstået en teknisk fejl. Kontakt tjenesteudbyder hvis problemet fortsætter.";

const BLOCKED_EN: &str = "Your NemID is blocked. Please contact NemID support.";
const BLOCKED_DA: &str = "Dit NemID er spærret. Kontakt NemID support.";

/// Language of the texts shown to the user.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// English
    #[default]
    English,
    /// Danish
    Danish,
}

/// Generates [`ClientError`] from `Variant => "CODE", english, danish` rows.
macro_rules! client_errors {
    ($($variant:ident => $code:literal, $english:expr, $danish:expr;)+) => {
        /// An error reported by the NemID client, identified by its code.
        ///
        /// For JSON this is the code, for example `"AUTH001"`.
        #[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
        pub enum ClientError {
            $(
                #[allow(missing_docs)]
                #[serde(rename = $code)]
                $variant,
            )+
        }

        impl ClientError {
            /// Every known client error.
            pub const ALL: &'static [ClientError] = &[$(ClientError::$variant),+];

            /// The code the client sends, for example `"AUTH001"`.
            pub fn code(&self) -> &'static str {
                match self {
                    $(ClientError::$variant => $code,)+
                }
            }

            /// A text suitable for showing the user.
            pub fn description(&self, language: Language) -> &'static str {
                match (self, language) {
                    $(
                        (ClientError::$variant, Language::English) => $english,
                        (ClientError::$variant, Language::Danish) => $danish,
                    )+
                }
            }
        }
    };
}

client_errors! {
    App001 => "APP001", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    App002 => "APP002", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    App003 => "APP003", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    App004 => "APP004", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    App007 => "APP007", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    App008 => "APP008", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    App009 => "APP009", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    App010 => "APP010", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;

    Auth001 => "AUTH001", BLOCKED_EN, BLOCKED_DA;
    Auth004 => "AUTH004",
        "Your NemID is temporarily locked and you cannot log on until the 8 hour time lock has been lifted.",
        "Dit NemID er midlertidigt låst i 8 timer og du kan ikke logge på før spærringen er ophævet.";
    Auth005 => "AUTH005", BLOCKED_EN, BLOCKED_DA;
    Auth006 => "AUTH006",
        "You have used all the codes on your code card.",
        "Du har brugt alle nøgler på nøglekortet.";
    Auth007 => "AUTH007",
        "Your NemID password is blocked due to too many failed password attempts.",
        "Din NemID-adgangskode er spærret på grund af for mange fejlede forsøg.";
    Auth008 => "AUTH008",
        "Your NemID is not active and you need support to issue a new activation password to activate.",
        "Dit NemID er ikke aktivt og du skal bestille en ny midlertidig adgangskode til aktivering hos support.";
    Auth009 => "AUTH009", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    Auth010 => "AUTH010", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    Auth011 => "AUTH011",
        "NemID login on mobile does not support authentication using a temporary password.",
        "NemID på mobil understøtter ikke brug af midlertidig adgangskode.";
    Auth012 => "AUTH012", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    Auth013 => "AUTH013", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    Auth017 => "AUTH017",
        "Something in the browser environment has caused NemID to stop working. This could be because of an incompatible plug-in, too restrictive privacy settings or other environment factors.",
        "En teknisk fejl i browseren gør at NemID ikke kan starte.";
    Auth018 => "AUTH018",
        "Your code app is revoked. To use it again please reactivate it.",
        "Din nøgleapp er spærret. For at bruge den igen skal den genaktiveres.";
    Auth019 => "AUTH019",
        "It is not possible to login with a code card, please use a code app or code token.",
        "Det er ikke muligt at logge ind med nøglekort, brug anden løsning nøgleapp eller nøgleviser.";
    Auth020 => "AUTH020",
        "Unable to login with 1-factor, please try with 2-factor login.",
        "Kunne ikke logge ind med 1-faktor, prøv med 2-faktor login.";
    Auth021 => "AUTH021",
        "This NemID is no longer valid due to insufficient identification of the user.",
        "Det er ikke længere muligt at logge ind med dette NemID pga. manglende opdatering af identitetsoplysninger.";

    Can001 => "CAN001",
        "You have cancelled the activation of NemID after submitting the activation password.",
        "Du har afbrudt aktiveringen efter du har brugt den midlertidige adgangskode.";
    Can002 => "CAN002", "You have cancelled the login.", "Du har afbrudt login.";
    Can003 => "CAN003",
        "The connection to the application has timed out or has been interrupted by another app.",
        "Forbindelsen til applikationen er timet ud eller er blevet afbrudt af en anden app.";
    Can004 => "CAN004", "The session is cancelled.", "Session er afbrudt.";
    Can005 => "CAN005",
        "You took too long to authenticate the request you had sent to your code app.",
        "Det tog for lang tid, før du godkendte den anmodning, du havde sendt til din nøgleapp.";
    Can007 => "CAN007",
        "You rejected your code app authentication request. If this was incorrect, you can submit a new request after clicking \u{201c}OK\u{201d} to finish.",
        "Du har afvist din anmodning om godkendelse i din nøgleapp. Hvis det var en fejl, kan du sende en ny anmodning, når du har afsluttet ved at klikke på \u{201d}Ok\u{201d}.";
    Can008 => "CAN008",
        "You sent a new authentication request to your code app overwriting an existing one.",
        "Du har sendt en ny anmodning til godkendelse i din nøgleapp, som overskriver en eksisterende.";

    Lock001 => "LOCK001",
        "You have used the wrong user ID or password too many times. Your NemID is now blocked for 8 hours after which you can try again.",
        "Du har angivet forkert bruger-id eller adgangskode for mange gange. NemID er nu spærret i 8 timer, hvorefter du kan forsøge igen.";
    Lock002 => "LOCK002",
        "You have used a wrong password too many times. Your NemID is blocked and cannot be used.",
        "Du har angivet en forkert adgangskode for mange gange. Dit NemID er spærret.";
    Lock003 => "LOCK003",
        "You have entered a wrong NemID key too many times. Your NemID is blocked and cannot be used.",
        "Du har angivet forkert NemID nøgle for mange gange. Dit NemID er spærret.";

    Srv001 => "SRV001", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    Srv002 => "SRV002", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    Srv003 => "SRV003", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    Srv004 => "SRV004", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    Srv005 => "SRV005", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    Srv006 => "SRV006", "Time limit exceeded.", "Tidsgrænse er overskredet.";
    Srv007 => "SRV007",
        "Please update to the most recent version of the application.",
        "Opdater venligst til den nyeste version af applikationen.";
    Srv008 => "SRV008", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    Srv010 => "SRV010", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    Srv011 => "SRV011", TECHNICAL_ERROR_EN, TECHNICAL_ERROR_DA;
    Srv012 => "SRV012",
        "IP address changed in flow.",
        "IP adresse ændredes under transaktionen.";

    Oces001 => "OCES001",
        "You only have NemID for online banking.",
        "Du har kun NemID til netbank.";
    Oces002 => "OCES002",
        "If you wish to use NemID for other services than online banking, you have to affiliate a public digital signature to your NemID.",
        "Ønsker du at bruge NemID til andet end netbank, skal du først tilknytte en offentlig digital signatur.";
    Oces003 => "OCES003",
        "You have attempted to log on using a NemID with no public digital signature.",
        "Der er ikke tilknyttet en offentlig digital signatur til det NemID du har forsøgt at logge på med.";
    Oces004 => "OCES004",
        "You can only use this NemID for your online banking service.",
        "Du kan kun bruge dette NemID til netbank.";
    Oces005 => "OCES005",
        "Issuing your public digital signature failed.",
        "Udstedelsen af din offentlige digitale signatur mislykkedes.";
    Oces006 => "OCES006",
        "You currently don\u{2019}t have an active public digital signature (OCES certificate) affiliated with your NemID.",
        "Du har ikke en aktiv offentlig digital signatur tilknyttet NemID i øjeblikket.";
}

/// The text is not a known client error code
#[derive(Clone, Copy, Debug, displaydoc::Display, Eq, PartialEq)]
pub struct UnknownClientError;

impl FromStr for ClientError {
    type Err = UnknownClientError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        ClientError::ALL
            .iter()
            .find(|error| error.code() == code)
            .copied()
            .ok_or(UnknownClientError)
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "The NemID client reported {}: {}",
            self.code(),
            self.description(Language::English)
        )
    }
}
