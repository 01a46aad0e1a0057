/// Enumerates every scalar field of [`ParameterSet`](super::ParameterSet)
/// together with its wire name, and hands the list to another macro. Keeping
/// the list in one place means overrides, averaging and the summary metadata
/// can never drift out of sync with the struct definition.
macro_rules! with_scalar_params {
    ($m:ident) => {
        $m! {
            n_population => "N",
            e_initial => "E_initial",
            a_initial => "A_initial",
            i_initial => "I_initial",
            r_initial => "R_initial",
            d_initial => "D_initial",
            hgen_initial => "HGen_initial",
            hicu_initial => "HICU_initial",
            hicuvent_initial => "HICUVent_initial",
            r0 => "R0",
            hospitalization_rate_general => "hospitalization_rate_general",
            hospitalization_rate_icu => "hospitalization_rate_icu",
            fraction_icu_requiring_ventilator => "fraction_icu_requiring_ventilator",
            sigma => "sigma",
            delta => "delta",
            kappa => "kappa",
            gamma => "gamma",
            symptoms_to_hospital_days => "symptoms_to_hospital_days",
            symptoms_to_mortality_days => "symptoms_to_mortality_days",
            los_general => "hospitalization_length_of_stay_general",
            los_icu => "hospitalization_length_of_stay_icu",
            los_icu_ventilator => "hospitalization_length_of_stay_icu_and_ventilator",
            mortality_rate => "mortality_rate",
            mortality_rate_no_general_beds => "mortality_rate_no_general_beds",
            mortality_rate_no_icu_beds => "mortality_rate_no_ICU_beds",
            mortality_rate_no_ventilator => "mortality_rate_no_ventilator",
            beds_general => "beds_general",
            beds_icu => "beds_ICU",
            ventilators => "ventilators",
        }
    };
}
