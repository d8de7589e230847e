/// Display labels for statistical variables.
///
/// Variable ids are opaque strings (`Count_Person_Male`); charts need short
/// human-readable labels ("Male"). `BUILTIN_LABELS` is the default table.
/// The aggregator never reads it directly: it receives a `VariableLabels`
/// value, so callers and tests can substitute their own table without
/// touching process-wide state.

use crate::model::StatsError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

// ---------------------------------------------------------------------------
// Built-in table
// ---------------------------------------------------------------------------

/// A single entry of the built-in label table.
pub struct VariableLabel {
    /// Opaque statistical variable id.
    pub id: &'static str,
    /// Short chart label.
    pub label: &'static str,
}

/// Labels for the variables the place pages chart out of the box.
///
/// Several breakdowns share labels across families ("Male" for both
/// population and unemployment rate, the income brackets for persons and
/// households).
pub static BUILTIN_LABELS: &[VariableLabel] = &[
    // Totals and rates
    VariableLabel { id: "Median_Age_Person", label: "Median Age" },
    VariableLabel { id: "Median_Income_Person", label: "Median Income" },
    VariableLabel { id: "UnemploymentRate_Person", label: "Unemployment Rate" },
    VariableLabel {
        id: "Count_UnemploymentInsuranceClaim_StateUnemploymentInsurance",
        label: "Unemployment Insurance Claim",
    },
    VariableLabel { id: "Count_Person_Employed", label: "Employed People" },
    VariableLabel { id: "Count_Person_InLaborForce", label: "People in Labor Force" },
    VariableLabel { id: "Count_Person", label: "Total" },
    VariableLabel { id: "Count_Person_PerArea", label: "Person per Area" },
    VariableLabel { id: "LifeExpectancy_Person", label: "Life Expectancy" },
    VariableLabel { id: "GrowthRate_Count_Person", label: "Population Growth Rate" },
    VariableLabel { id: "FertilityRate_Person_Female", label: "Fertility Rate" },
    // Economics
    VariableLabel { id: "Amount_EconomicActivity_GrossDomesticProduction_Nominal", label: "GDP" },
    VariableLabel {
        id: "GrowthRate_Amount_EconomicActivity_GrossDomesticProduction",
        label: "GDP Growth Rate",
    },
    VariableLabel { id: "Amount_Debt_Government", label: "Government Debt" },
    VariableLabel {
        id: "Amount_EconomicActivity_GrossDomesticProduction_Nominal_PerCapita",
        label: "GDP Per Capita",
    },
    VariableLabel {
        id: "Amount_EconomicActivity_GrossNationalIncome_PurchasingPowerParity_PerCapita",
        label: "GNI PPP Per Capita",
    },
    VariableLabel {
        id: "Amount_EconomicActivity_GrossNationalIncome_PurchasingPowerParity",
        label: "GNI PPP",
    },
    // Environment
    VariableLabel {
        id: "Amount_Consumption_Energy_PerCapita",
        label: "Energy Consumption Per Capita",
    },
    VariableLabel {
        id: "Amount_Emissions_CarbonDioxide_PerCapita",
        label: "CO2 Emissions Per Capita",
    },
    VariableLabel {
        id: "Amount_Consumption_Electricity_PerCapita",
        label: "Electricity Consumption Per Capita",
    },
    VariableLabel { id: "Count_EarthquakeEvent", label: "Earthquake Event" },
    VariableLabel { id: "Count_CycloneEvent", label: "Cyclone Event" },
    // Age
    VariableLabel { id: "Count_Person_Upto5Years", label: "0-5" },
    VariableLabel { id: "Count_Person_5To17Years", label: "5-17" },
    VariableLabel { id: "Count_Person_15To19Years", label: "15-19" },
    VariableLabel { id: "Count_Person_20To24Years", label: "20-24" },
    VariableLabel { id: "Count_Person_25To29Years", label: "25-29" },
    VariableLabel { id: "Count_Person_25To34Years", label: "25-34" },
    VariableLabel { id: "Count_Person_30To34Years", label: "30-34" },
    VariableLabel { id: "Count_Person_35To39Years", label: "35-39" },
    VariableLabel { id: "Count_Person_35To44Years", label: "35-44" },
    VariableLabel { id: "Count_Person_40To44Years", label: "40-44" },
    VariableLabel { id: "Count_Person_45To49Years", label: "45-49" },
    VariableLabel { id: "Count_Person_45To54Years", label: "45-54" },
    VariableLabel { id: "Count_Person_50To54Years", label: "50-54" },
    VariableLabel { id: "Count_Person_55To59Years", label: "55-59" },
    VariableLabel { id: "Count_Person_60To64Years", label: "60-64" },
    VariableLabel { id: "Count_Person_65To69Years", label: "65-69" },
    VariableLabel { id: "Count_Person_65OrMoreYears", label: "65+" },
    VariableLabel { id: "Count_Person_70To74Years", label: "70-74" },
    VariableLabel { id: "Count_Person_75To79Years", label: "75-79" },
    VariableLabel { id: "Count_Person_80To84Years", label: "80-84" },
    VariableLabel { id: "Count_Person_85To89Years", label: "85-89" },
    // Gender
    VariableLabel { id: "Count_Person_Male", label: "Male" },
    VariableLabel { id: "Count_Person_Female", label: "Female" },
    // Personal income
    VariableLabel { id: "Count_Person_IncomeOfUpto9999USDollar", label: "Under $10K" },
    VariableLabel { id: "Count_Person_IncomeOf10000To14999USDollar", label: "$10K to $15K" },
    VariableLabel { id: "Count_Person_IncomeOf15000To24999USDollar", label: "$15K to $25K" },
    VariableLabel { id: "Count_Person_IncomeOf25000To34999USDollar", label: "$25K to $35K" },
    VariableLabel { id: "Count_Person_IncomeOf35000To49999USDollar", label: "$35K to $50K" },
    VariableLabel { id: "Count_Person_IncomeOf50000To64999USDollar", label: "$50K to $65K" },
    VariableLabel { id: "Count_Person_IncomeOf65000To74999USDollar", label: "$65K to $75K" },
    VariableLabel { id: "Count_Person_IncomeOf75000OrMoreUSDollar", label: "Over $75K" },
    // Marital status
    VariableLabel { id: "Count_Person_MarriedAndNotSeparated", label: "Married" },
    VariableLabel { id: "Count_Person_Divorced", label: "Divorced" },
    VariableLabel { id: "Count_Person_NeverMarried", label: "Never Married" },
    VariableLabel { id: "Count_Person_Widowed", label: "Widowed" },
    VariableLabel { id: "Count_Person_Separated", label: "Separated" },
    // Education
    VariableLabel {
        id: "Count_Person_EducationalAttainmentNoSchoolingCompleted",
        label: "No Schooling",
    },
    VariableLabel {
        id: "Count_Person_EducationalAttainmentRegularHighSchoolDiploma",
        label: "High School",
    },
    VariableLabel { id: "Count_Person_EducationalAttainmentBachelorsDegree", label: "Bachelors" },
    VariableLabel { id: "Count_Person_EducationalAttainmentMastersDegree", label: "Masters" },
    VariableLabel { id: "Count_Person_EducationalAttainmentDoctorateDegree", label: "Doctorate" },
    // Household income
    VariableLabel { id: "Count_Household_IncomeOfUpto10000USDollar", label: "Under $10K" },
    VariableLabel { id: "Count_Household_IncomeOf10000To14999USDollar", label: "$10K to $15K" },
    VariableLabel { id: "Count_Household_IncomeOf20000To24999USDollar", label: "$20K to $25K" },
    VariableLabel { id: "Count_Household_IncomeOf30000To34999USDollar", label: "$30K to $35K" },
    VariableLabel { id: "Count_Household_IncomeOf40000To44999USDollar", label: "$40K to $45K" },
    VariableLabel { id: "Count_Household_IncomeOf50000To59999USDollar", label: "$50K to $60K" },
    VariableLabel { id: "Count_Household_IncomeOf60000To74999USDollar", label: "$60K to $75K" },
    VariableLabel { id: "Count_Household_IncomeOf75000To99999USDollar", label: "$75K to $100K" },
    VariableLabel { id: "Count_Household_IncomeOf100000To124999USDollar", label: "$100K to $125K" },
    VariableLabel { id: "Count_Household_IncomeOf125000To149999USDollar", label: "$125K to $150K" },
    VariableLabel { id: "Count_Household_IncomeOf150000To199999USDollar", label: "$150K to $200K" },
    VariableLabel { id: "Count_Household_IncomeOf200000OrMoreUSDollar", label: "Over $200K" },
    // COVID-19
    VariableLabel {
        id: "CumulativeCount_MedicalConditionIncident_COVID_19_ConfirmedOrProbableCase",
        label: "COVID-19 Cumulative Cases",
    },
    VariableLabel {
        id: "CumulativeCount_MedicalConditionIncident_COVID_19_PatientDeceased",
        label: "COVID-19 Cumulative Deaths",
    },
    // Citizenship
    VariableLabel { id: "Count_Person_USCitizenBornInTheUnitedStates", label: "Born in USA" },
    VariableLabel {
        id: "Count_Person_USCitizenByNaturalization",
        label: "Citizen by Naturalization",
    },
    VariableLabel { id: "Count_Person_NotAUSCitizen", label: "Not a Citizen" },
    VariableLabel { id: "Count_Person_USCitizenBornAbroadOfAmericanParents", label: "Born Abroad" },
    // Mortality cause
    VariableLabel { id: "Count_Death_DiseasesOfTheCirculatorySystem", label: "Circulatory System" },
    VariableLabel { id: "Count_Death_Neoplasms", label: "Neoplasms" },
    VariableLabel { id: "Count_Death_DiseasesOfTheRespiratorySystem", label: "Respiratory System" },
    VariableLabel { id: "Count_Death_ExternalCauses", label: "External Causes" },
    VariableLabel { id: "Count_Death_DiseasesOfTheNervousSystem", label: "Nervous System" },
    // Health outcomes
    VariableLabel { id: "Percent_Person_WithHighCholesterol", label: "High Cholesterol" },
    VariableLabel { id: "Percent_Person_WithHighBloodPressure", label: "High Blood Pressure" },
    VariableLabel { id: "Percent_Person_WithArthritis", label: "Arthritis" },
    VariableLabel { id: "Percent_Person_WithMentalHealthNotGood", label: "Mental Health Not Good" },
    VariableLabel {
        id: "Percent_Person_WithPhysicalHealthNotGood",
        label: "Physical Health Not Good",
    },
    // Health behaviors
    VariableLabel { id: "Percent_Person_SleepLessThan7Hours", label: "Sleep Less Than 7 Hours" },
    VariableLabel { id: "Percent_Person_Obesity", label: "Obesity" },
    VariableLabel { id: "Percent_Person_BingeDrinking", label: "Binge Drinking" },
    VariableLabel { id: "Percent_Person_PhysicalInactivity", label: "Physical Inactivity" },
    VariableLabel { id: "Percent_Person_Smoking", label: "Smoking" },
    // Drug distribution
    VariableLabel { id: "RetailDrugDistribution_DrugDistribution_Oxycodone", label: "Oxycodone" },
    VariableLabel {
        id: "RetailDrugDistribution_DrugDistribution_Hydrocodone",
        label: "Hydrocodone",
    },
    VariableLabel { id: "RetailDrugDistribution_DrugDistribution_Codeine", label: "Codeine" },
    VariableLabel {
        id: "RetailDrugDistribution_DrugDistribution_Amphetamine",
        label: "Amphetamine",
    },
    VariableLabel { id: "RetailDrugDistribution_DrugDistribution_Morphine", label: "Morphine" },
    // School enrollment
    VariableLabel { id: "Count_Person_EnrolledInSchool", label: "Enrolled in School" },
    VariableLabel { id: "Count_Person_NotEnrolledInSchool", label: "Not Enrolled in School" },
    // Crime
    VariableLabel { id: "Count_CriminalActivities_CombinedCrime", label: "Combined Crimes" },
    VariableLabel { id: "Count_CriminalActivities_ViolentCrime", label: "Violent Crimes" },
    VariableLabel { id: "Count_CriminalActivities_PropertyCrime", label: "Property Crimes" },
    VariableLabel { id: "Count_CriminalActivities_Arson", label: "Arson" },
    // Employment
    VariableLabel { id: "UnemploymentRate_Person_Male", label: "Male" },
    VariableLabel { id: "UnemploymentRate_Person_Female", label: "Female" },
];

/// Looks up a built-in entry by variable id. Returns `None` if not found.
pub fn find_builtin(id: &str) -> Option<&'static VariableLabel> {
    BUILTIN_LABELS.iter().find(|l| l.id == id)
}

// ---------------------------------------------------------------------------
// Injected label table
// ---------------------------------------------------------------------------

/// Variable id to label mapping handed to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableLabels {
    labels: HashMap<String, String>,
}

impl VariableLabels {
    /// An empty table: every label falls back to the raw variable id.
    pub fn empty() -> Self {
        Self {
            labels: HashMap::new(),
        }
    }

    /// Builds a table from explicit `(id, label)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            labels: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns a copy of this table with `overrides` layered on top.
    pub fn with_overrides(mut self, overrides: &HashMap<String, String>) -> Self {
        for (id, label) in overrides {
            self.labels.insert(id.clone(), label.clone());
        }
        self
    }

    /// Parses a flat `id = "label"` TOML document and layers it over the
    /// built-in table.
    pub fn from_toml_str(contents: &str) -> Result<Self, StatsError> {
        Ok(Self::default().with_overrides(&parse_overrides(contents)?))
    }

    /// Label for `id`, falling back to the id itself when unknown.
    pub fn label_for<'a>(&'a self, id: &'a str) -> &'a str {
        self.labels.get(id).map(String::as_str).unwrap_or(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.labels.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for VariableLabels {
    /// The built-in table.
    fn default() -> Self {
        Self::from_pairs(BUILTIN_LABELS.iter().map(|l| (l.id, l.label)))
    }
}

fn parse_overrides(contents: &str) -> Result<HashMap<String, String>, StatsError> {
    toml::from_str(contents)
        .map_err(|e| StatsError::ConfigError(format!("invalid label table: {}", e)))
}

/// Loads a label override file and layers it over `base`.
pub fn load_labels(path: &Path, base: VariableLabels) -> Result<VariableLabels, StatsError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        StatsError::ConfigError(format!("failed to read {}: {}", path.display(), e))
    })?;
    Ok(base.with_overrides(&parse_overrides(&contents)?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
