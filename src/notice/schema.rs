//! Typed view of an eForms `ContractNotice`.
//!
//! Every field is a plain `String`/`Vec` that defaults to empty when the element is absent, so
//! decoding never fails on missing or unknown elements.

use super::tree::XmlElement;

const ORGANIZATIONS: &[&str] = &[
    "UBLExtensions",
    "UBLExtension",
    "ExtensionContent",
    "EformsExtension",
    "Organizations",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ContractNotice {
    pub(crate) id: String,
    pub(crate) contract_folder_id: String,
    pub(crate) issue_date: String,
    pub(crate) organizations: Vec<Organization>,
    pub(crate) contracting_party_name: String,
    pub(crate) deadline: DeadlinePeriod,
    pub(crate) project: Project,
    pub(crate) lot: Lot,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Organization {
    pub(crate) name: String,
    pub(crate) website: String,
    pub(crate) endpoint_id: String,
    pub(crate) address: PostalAddress,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PostalAddress {
    pub(crate) street: String,
    pub(crate) city: String,
    pub(crate) postal_zone: String,
    pub(crate) country_subentity: String,
    pub(crate) country: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct DeadlinePeriod {
    pub(crate) end_date: String,
    pub(crate) end_time: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Project {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) procurement_type: String,
    pub(crate) main_classification: String,
    pub(crate) additional_classifications: Vec<String>,
    pub(crate) location: PostalAddress,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Lot {
    pub(crate) id: String,
    pub(crate) project: Project,
    pub(crate) deadline: DeadlinePeriod,
    pub(crate) award_criterion_name: String,
    pub(crate) award_criterion_type: String,
    pub(crate) document_uri: String,
}

impl ContractNotice {
    /// Decode the notice rooted at `root`. Only the first lot is considered.
    pub(crate) fn from_root(root: &XmlElement) -> Self {
        let organizations = root
            .at(ORGANIZATIONS)
            .map(|orgs| {
                orgs.children_named("Organization")
                    .map(Organization::from_element)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: root.text_at(&["ID"]),
            contract_folder_id: root.text_at(&["ContractFolderID"]),
            issue_date: root.text_at(&["IssueDate"]),
            organizations,
            contracting_party_name: root.text_at(&["ContractingParty", "Party", "PartyName", "Name"]),
            deadline: DeadlinePeriod::from_parent(root.child("TenderingProcess")),
            project: Project::from_element(root.child("ProcurementProject")),
            lot: Lot::from_element(root.child("ProcurementProjectLot")),
        }
    }
}

impl Organization {
    fn from_element(element: &XmlElement) -> Self {
        let company = element.child("Company");
        let text = |path: &[&str]| company.map(|c| c.text_at(path)).unwrap_or_default();
        Self {
            name: text(&["PartyName", "Name"]),
            website: text(&["WebsiteURI"]),
            endpoint_id: text(&["EndpointID"]),
            address: PostalAddress::from_element(company.and_then(|c| c.child("PostalAddress"))),
        }
    }
}

impl PostalAddress {
    fn from_element(element: Option<&XmlElement>) -> Self {
        let Some(address) = element else {
            return Self::default();
        };
        Self {
            street: address.text_at(&["StreetName"]),
            city: address.text_at(&["CityName"]),
            postal_zone: address.text_at(&["PostalZone"]),
            country_subentity: address.text_at(&["CountrySubentityCode"]),
            country: address.text_at(&["Country", "IdentificationCode"]),
        }
    }
}

impl DeadlinePeriod {
    fn from_parent(tendering_process: Option<&XmlElement>) -> Self {
        let Some(period) = tendering_process.and_then(|p| p.child("TenderSubmissionDeadlinePeriod"))
        else {
            return Self::default();
        };
        Self {
            end_date: period.text_at(&["EndDate"]),
            end_time: period.text_at(&["EndTime"]),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.end_date.is_empty()
    }
}

impl Project {
    fn from_element(element: Option<&XmlElement>) -> Self {
        let Some(project) = element else {
            return Self::default();
        };
        Self {
            name: project.text_at(&["Name"]),
            description: project.text_at(&["Description"]),
            procurement_type: project.text_at(&["ProcurementTypeCode"]),
            main_classification: project
                .text_at(&["MainCommodityClassification", "ItemClassificationCode"]),
            additional_classifications: project
                .children_named("AdditionalCommodityClassification")
                .map(|element| element.text_at(&["ItemClassificationCode"]))
                .collect(),
            location: PostalAddress::from_element(project.at(&["RealizedLocation", "Address"])),
        }
    }
}

impl Lot {
    fn from_element(element: Option<&XmlElement>) -> Self {
        let Some(lot) = element else {
            return Self::default();
        };
        let criterion = lot.at(&[
            "TenderingTerms",
            "AwardingTerms",
            "AwardingCriterion",
            "SubordinateAwardingCriterion",
        ]);
        Self {
            id: lot.text_at(&["ID"]),
            project: Project::from_element(lot.child("ProcurementProject")),
            deadline: DeadlinePeriod::from_parent(lot.child("TenderingProcess")),
            award_criterion_name: criterion.map(|c| c.text_at(&["Name"])).unwrap_or_default(),
            award_criterion_type: criterion
                .map(|c| c.text_at(&["AwardingCriterionTypeCode"]))
                .unwrap_or_default(),
            document_uri: lot.text_at(&[
                "TenderingTerms",
                "CallForTendersDocumentReference",
                "Attachment",
                "ExternalReference",
                "URI",
            ]),
        }
    }
}
